use derive_more::{Deref, From, IntoIterator};

/// One reward per completed epoch, in order.
#[derive(Debug, Clone, Default, PartialEq, Deref, From, IntoIterator)]
pub struct RewardCurve(pub Vec<f32>);

impl RewardCurve {
    pub fn push(&mut self, epoch_reward: f32) {
        self.0.push(epoch_reward);
    }

    /// Element-wise mean of several curves. Early stopping can leave curves of different lengths,
    /// the result is truncated to the shortest one.
    pub fn mean_of(curves: &[RewardCurve]) -> RewardCurve {
        let Some(shortest) = curves.iter().map(|curve| curve.len()).min() else {
            return RewardCurve::default();
        };
        let count = curves.len() as f32;
        RewardCurve(
            (0..shortest)
                .map(|epoch| curves.iter().map(|curve| curve[epoch]).sum::<f32>() / count)
                .collect(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::RewardCurve;

    #[test]
    fn mean_truncates_to_shortest() {
        let curves = [
            RewardCurve(vec![1., 2., 3.]),
            RewardCurve(vec![3., 4.]),
        ];
        assert_eq!(RewardCurve::mean_of(&curves), RewardCurve(vec![2., 3.]));
    }

    #[test]
    fn mean_of_nothing_is_empty() {
        assert!(RewardCurve::mean_of(&[]).is_empty());
    }
}
