use crate::config::{DifferentialTimeMode, TravelTimeChannelAxis};
use crate::core::lag_refine::{argmax_first, LagRefiner};
use crate::io::stations::StationTable;
use crate::io::traveltime::TravelTimeSource;
use crate::types::{CcError, CcResult, DifferentialPick, PairGroup, Phase};
use ndarray::s;

/// Pick selection parameters
#[derive(Debug, Clone)]
pub struct PickSelectorParams {
    /// Accept only cc_score strictly above this
    pub min_cc_score: f64,
    /// Channels per phase block
    pub num_channel: usize,
    /// Phase of each channel block, in block order
    pub phases: Vec<Phase>,
    pub mode: DifferentialTimeMode,
    pub channel_axis: TravelTimeChannelAxis,
}

impl Default for PickSelectorParams {
    fn default() -> Self {
        Self {
            min_cc_score: 0.5,
            num_channel: 3,
            phases: vec![Phase::P, Phase::S],
            mode: DifferentialTimeMode::ModelOnly,
            channel_axis: TravelTimeChannelAxis::Phase,
        }
    }
}

/// Picks the best-correlated channel per phase block and station
pub struct PickSelector {
    params: PickSelectorParams,
    refiner: LagRefiner,
    with_network: bool,
}

impl PickSelector {
    pub fn new(refiner: LagRefiner) -> Self {
        Self::with_params(PickSelectorParams::default(), refiner)
    }

    pub fn with_params(params: PickSelectorParams, refiner: LagRefiner) -> Self {
        Self {
            params,
            refiner,
            with_network: false,
        }
    }

    /// Prefix station codes with their network
    pub fn with_network_codes(mut self, enabled: bool) -> Self {
        self.with_network = enabled;
        self
    }

    pub fn params(&self) -> &PickSelectorParams {
        &self.params
    }

    fn check_layout(&self, group: &PairGroup) -> CcResult<()> {
        let (nch, _, npick) = group.measurement.dim();
        let expected = self.params.num_channel * self.params.phases.len();
        let corrupt = |reason: String| CcError::CorruptGroup {
            pair: group.pair,
            reason,
        };

        if nch != expected {
            return Err(corrupt(format!(
                "{} channels, expected {} ({} phases x {} channels)",
                nch,
                expected,
                self.params.phases.len(),
                self.params.num_channel
            )));
        }
        if npick == 0 {
            return Err(corrupt("no pick axis entries".to_string()));
        }
        if group.measurement.profile_len() != self.refiner.profile_len() {
            return Err(corrupt(format!(
                "neighbor profile length {}, expected {}",
                group.measurement.profile_len(),
                self.refiner.profile_len()
            )));
        }
        Ok(())
    }

    /// Accepted picks for one pair, block-major then station order
    pub fn select(
        &self,
        group: &PairGroup,
        travel_times: &dyn TravelTimeSource,
        stations: &StationTable,
    ) -> CcResult<Vec<DifferentialPick>> {
        self.check_layout(group)?;

        let m = &group.measurement;
        let (_, nsta, _) = m.dim();
        let nc = self.params.num_channel;
        let threshold = self.params.min_cc_score as f32;
        let mut picks = Vec::new();

        for (i, &phase) in self.params.phases.iter().enumerate() {
            let tt_channel = match self.params.channel_axis {
                TravelTimeChannelAxis::Phase => i,
                TravelTimeChannelAxis::Channel => i * nc,
            };

            for j in 0..nsta {
                let tt_a = travel_times.travel_time(group.pair.id_a, tt_channel, j)?;
                let tt_b = travel_times.travel_time(group.pair.id_b, tt_channel, j)?;
                let model_time = (tt_a - tt_b) as f64;

                let block = m.cc_score.slice(s![i * nc..(i + 1) * nc, j, 0]);
                let Some(offset) = argmax_first(block.iter().copied()) else {
                    continue;
                };
                let best = i * nc + offset;
                let score = m.cc_score[[best, j, 0]];
                if !(score > threshold) {
                    continue;
                }

                let refined = self
                    .refiner
                    .refine(m.neighbor_score.slice(s![best, j, 0, ..]), m.cc_index[[best, j, 0]])?;
                let weight = m.cc_weight[[best, j, 0]] as f64;
                let score = score as f64;

                let (time, quality) = match self.params.mode {
                    DifferentialTimeMode::ModelOnly => (model_time, score),
                    DifferentialTimeMode::CorrelationCorrected => {
                        (model_time + refined.lag, score * weight)
                    }
                };

                picks.push(DifferentialPick {
                    station: stations.get(j)?.label(self.with_network),
                    time,
                    quality,
                    phase,
                    model_time,
                    refined_lag: refined.lag,
                    cc_score: score,
                    cc_weight: weight,
                });
            }
        }

        Ok(picks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::traveltime::ArrayTravelTimeTable;
    use crate::types::{CorrelationMeasurement, EventPair, StationRecord};
    use approx::assert_abs_diff_eq;
    use ndarray::{Array3, Array4};

    fn stations(n: usize) -> StationTable {
        StationTable::new(
            (0..n)
                .map(|k| StationRecord {
                    code: format!("ST{}", k),
                    network: Some("XX".to_string()),
                    latitude: 0.0,
                    longitude: 0.0,
                })
                .collect(),
        )
    }

    fn group(scores: [f32; 6]) -> PairGroup {
        let pair = EventPair::new(0, 1);
        let mut cc_score = Array3::<f32>::zeros((6, 1, 1));
        for (c, &v) in scores.iter().enumerate() {
            cc_score[[c, 0, 0]] = v;
        }
        let neighbor = Array4::from_elem((6, 1, 1, 3), 0.5f32);
        let measurement = CorrelationMeasurement::new(
            pair,
            cc_score,
            Array3::from_elem((6, 1, 1), 2),
            Array3::from_elem((6, 1, 1), 0.5),
            neighbor,
        )
        .unwrap();
        PairGroup { pair, measurement }
    }

    fn table() -> ArrayTravelTimeTable {
        let mut data = Array3::<f32>::zeros((2, 2, 1));
        data[[0, 0, 0]] = 5.0;
        data[[1, 0, 0]] = 3.0;
        data[[0, 1, 0]] = 9.0;
        data[[1, 1, 0]] = 5.5;
        ArrayTravelTimeTable::new(data)
    }

    #[test]
    fn test_best_channel_and_model_time() {
        let selector = PickSelector::new(LagRefiner::new());
        let picks = selector
            .select(&group([0.2, 0.8, 0.6, 0.9, 0.1, 0.3]), &table(), &stations(1))
            .unwrap();

        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].phase, Phase::P);
        assert_abs_diff_eq!(picks[0].time, 2.0);
        assert_abs_diff_eq!(picks[0].quality, 0.8f32 as f64);
        assert_eq!(picks[0].station, "ST0 ");
        assert_eq!(picks[1].phase, Phase::S);
        assert_abs_diff_eq!(picks[1].time, 3.5);
        assert_abs_diff_eq!(picks[1].refined_lag, 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_threshold_is_strict() {
        let selector = PickSelector::with_params(
            PickSelectorParams {
                min_cc_score: 0.6,
                ..Default::default()
            },
            LagRefiner::new(),
        );
        let picks = selector
            .select(&group([0.6, 0.1, 0.1, 0.6 + 1e-6, 0.1, 0.1]), &table(), &stations(1))
            .unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].phase, Phase::S);
    }

    #[test]
    fn test_nan_in_block_drops_that_pick() {
        let selector = PickSelector::new(LagRefiner::new());
        let picks = selector
            .select(&group([0.9, f32::NAN, 0.1, 0.1, 0.7, 0.1]), &table(), &stations(1))
            .unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].phase, Phase::S);
        assert_abs_diff_eq!(picks[0].quality, 0.7f32 as f64);
    }

    #[test]
    fn test_channel_axis_reads_block_base_channel() {
        let mut data = Array3::<f32>::zeros((2, 6, 1));
        data[[0, 0, 0]] = 5.0;
        data[[1, 0, 0]] = 3.0;
        data[[0, 3, 0]] = 9.0;
        data[[1, 3, 0]] = 5.5;
        let selector = PickSelector::with_params(
            PickSelectorParams {
                channel_axis: TravelTimeChannelAxis::Channel,
                ..Default::default()
            },
            LagRefiner::new(),
        );
        let picks = selector
            .select(
                &group([0.9, 0.1, 0.1, 0.1, 0.9, 0.1]),
                &ArrayTravelTimeTable::new(data),
                &stations(1),
            )
            .unwrap();
        assert_eq!(picks.len(), 2);
        assert_abs_diff_eq!(picks[0].time, 2.0);
        assert_abs_diff_eq!(picks[1].time, 3.5);
    }

    #[test]
    fn test_corrected_mode() {
        let selector = PickSelector::with_params(
            PickSelectorParams {
                mode: DifferentialTimeMode::CorrelationCorrected,
                ..Default::default()
            },
            LagRefiner::new(),
        )
        .with_network_codes(true);
        let picks = selector
            .select(&group([0.9, 0.1, 0.1, 0.1, 0.1, 0.1]), &table(), &stations(1))
            .unwrap();
        assert_eq!(picks.len(), 1);
        assert_abs_diff_eq!(picks[0].time, 2.02, epsilon = 1e-9);
        assert_abs_diff_eq!(picks[0].quality, 0.9f32 as f64 * 0.5, epsilon = 1e-9);
        assert_eq!(picks[0].station, "XXST0 ");
    }

    #[test]
    fn test_channel_count_must_match_phases() {
        let selector = PickSelector::with_params(
            PickSelectorParams {
                phases: vec![Phase::P],
                ..Default::default()
            },
            LagRefiner::new(),
        );
        let err = selector
            .select(&group([0.9; 6]), &table(), &stations(1))
            .unwrap_err();
        assert!(matches!(err, CcError::CorruptGroup { .. }));
    }

    #[test]
    fn test_missing_station_is_out_of_range() {
        let selector = PickSelector::new(LagRefiner::new());
        let err = selector
            .select(&group([0.9; 6]), &table(), &stations(0))
            .unwrap_err();
        assert!(matches!(err, CcError::IndexOutOfRange { axis: "station", .. }));
    }
}
