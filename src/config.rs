use crate::core::lag_refine::LagRefinerParams;
use crate::core::pick_select::PickSelectorParams;
use crate::types::{CcError, CcResult, Phase};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the emitted differential time is composed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferentialTimeMode {
    /// Model travel-time difference only, quality = cc_score
    #[default]
    ModelOnly,
    /// Model difference plus refined correlation lag, quality = cc_score * cc_weight
    CorrelationCorrected,
}

/// Which index addresses the middle axis of the travel-time table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelTimeChannelAxis {
    /// Table shaped [events, phases, stations]; indexed by channel block.
    /// Reading the block's first channel instead needs `"channel"`, and
    /// tables shaped [events, channels, stations] must set it.
    #[default]
    Phase,
    /// Table shaped [events, channels, stations]; indexed by block base channel
    Channel,
}

/// Conversion run configuration
///
/// Usually loaded from the template `config.json` shared with the
/// correlation stage; keys this crate does not know about are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Picks need cc_score strictly above this
    pub min_cc_score: f64,
    /// [events, channels-or-phases, stations]
    pub traveltime_shape: Option<[usize; 3]>,
    /// Coarse correlation sampling interval (seconds)
    pub dt: f64,
    /// dt / dt_fine
    pub fine_ratio: usize,
    /// Neighbor profile holds 2 * halfwidth + 1 samples
    pub neighbor_halfwidth: usize,
    /// Component channels per phase block
    pub num_channel: usize,
    pub phase_list: Vec<String>,
    pub differential_time_mode: DifferentialTimeMode,
    pub traveltime_channel_axis: TravelTimeChannelAxis,
    /// Prefix station codes with their network code
    pub station_code_with_network: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            min_cc_score: 0.5,
            traveltime_shape: None,
            dt: 0.01,
            fine_ratio: 100,
            neighbor_halfwidth: 1,
            num_channel: 3,
            phase_list: vec!["P".to_string(), "S".to_string()],
            differential_time_mode: DifferentialTimeMode::ModelOnly,
            traveltime_channel_axis: TravelTimeChannelAxis::Phase,
            station_code_with_network: false,
        }
    }
}

impl ConversionConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CcResult<Self> {
        log::info!("Reading configuration: {}", path.as_ref().display());
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> CcResult<()> {
        if self.num_channel == 0 {
            return Err(CcError::Config("num_channel must be positive".to_string()));
        }
        if self.fine_ratio == 0 {
            return Err(CcError::Config("fine_ratio must be positive".to_string()));
        }
        if !(self.dt > 0.0) {
            return Err(CcError::Config(format!("dt must be positive, got {}", self.dt)));
        }
        if self.phase_list.is_empty() {
            return Err(CcError::Config("phase_list is empty".to_string()));
        }
        self.phases()?;
        Ok(())
    }

    pub fn phases(&self) -> CcResult<Vec<Phase>> {
        self.phase_list.iter().map(|p| p.parse()).collect()
    }

    /// Travel-time table shape, required before the table can be opened
    pub fn require_traveltime_shape(&self) -> CcResult<[usize; 3]> {
        self.traveltime_shape
            .ok_or_else(|| CcError::Config("traveltime_shape is not configured".to_string()))
    }

    pub fn lag_refiner_params(&self) -> LagRefinerParams {
        LagRefinerParams {
            dt: self.dt,
            fine_ratio: self.fine_ratio,
            halfwidth: self.neighbor_halfwidth,
        }
    }

    pub fn pick_selector_params(&self) -> CcResult<PickSelectorParams> {
        Ok(PickSelectorParams {
            min_cc_score: self.min_cc_score,
            num_channel: self.num_channel,
            phases: self.phases()?,
            mode: self.differential_time_mode,
            channel_axis: self.traveltime_channel_axis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConversionConfig::default();
        assert_eq!(config.min_cc_score, 0.5);
        assert_eq!(config.num_channel, 3);
        assert_eq!(config.phases().unwrap(), vec![Phase::P, Phase::S]);
        assert_eq!(config.differential_time_mode, DifferentialTimeMode::ModelOnly);
        assert!(config.require_traveltime_shape().is_err());
    }

    #[test]
    fn test_template_config_with_foreign_keys() {
        let json = r#"{
            "traveltime_shape": [10, 2, 4],
            "sampling_rate": 100,
            "min_cc_score": 0.6,
            "differential_time_mode": "correlation_corrected"
        }"#;
        let config: ConversionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.traveltime_shape, Some([10, 2, 4]));
        assert_eq!(config.min_cc_score, 0.6);
        assert_eq!(config.dt, 0.01);
        assert_eq!(config.differential_time_mode, DifferentialTimeMode::CorrelationCorrected);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_phase() {
        let config = ConversionConfig {
            phase_list: vec!["P".to_string(), "Lg".to_string()],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CcError::Config(_))));
    }

    #[test]
    fn test_channel_axis_selection() {
        assert_eq!(
            ConversionConfig::default().traveltime_channel_axis,
            TravelTimeChannelAxis::Phase
        );
        let config: ConversionConfig =
            serde_json::from_str(r#"{"traveltime_channel_axis": "channel"}"#).unwrap();
        assert_eq!(config.traveltime_channel_axis, TravelTimeChannelAxis::Channel);
        assert_eq!(
            config.pick_selector_params().unwrap().channel_axis,
            TravelTimeChannelAxis::Channel
        );
    }
}
