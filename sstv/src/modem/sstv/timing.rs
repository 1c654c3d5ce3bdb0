//! Line timing of a transmission, recovered from its sync pulses.

/// Sync pulses further than this from the first fit are left out of the
/// second, in samples.
const MAX_RESIDUAL: f64 = 2.0;

/// Where every line of a transmission starts, as a straight line through the
/// sync pulses that were found.
///
/// If the recording's sample clock differs from the transmitter's, lines are
/// a little longer or shorter than nominal, and the error adds up over a
/// line. Fitting all sync pulses measures the actual line length to a fraction
/// of a sample, which single pulses can't.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineClock {
    /// End of the sync pulse of the first line, in samples.
    pub first_sync_end: f64,
    /// Samples per line.
    pub line_len: f64,
}

impl LineClock {
    #[inline]
    pub fn new(first_sync_end: f64, line_len: f64) -> Self {
        Self {
            first_sync_end,
            line_len,
        }
    }

    #[inline]
    pub fn sync_end(&self, y: usize) -> f64 {
        self.first_sync_end + y as f64 * self.line_len
    }

    /// Fits a clock to `syncs`, pairs of line index and sync pulse end.
    ///
    /// Pulses that are more than a couple of samples off after a first fit
    /// are dropped and the rest is fitted again. With a single pulse the line
    /// length of `nominal` is kept, without any `nominal` is returned.
    pub fn fit(syncs: &[(usize, f64)], nominal: Self) -> Self {
        let Some(clock) = least_squares(syncs, nominal.line_len)
        else {
            return nominal;
        };

        let inliers = syncs
            .iter()
            .copied()
            .filter(|&(y, sync_end)| (sync_end - clock.sync_end(y)).abs() <= MAX_RESIDUAL)
            .collect::<Vec<_>>();

        let clock = least_squares(&inliers, nominal.line_len).unwrap_or(clock);
        tracing::debug!(
            num_syncs = syncs.len(),
            num_inliers = inliers.len(),
            line_len = clock.line_len,
            nominal = nominal.line_len,
            "fitted line clock"
        );
        clock
    }
}

fn least_squares(syncs: &[(usize, f64)], nominal_line_len: f64) -> Option<LineClock> {
    let (&(y, sync_end), rest) = syncs.split_first()?;
    let single = LineClock::new(sync_end - y as f64 * nominal_line_len, nominal_line_len);
    if rest.is_empty() {
        return Some(single);
    }

    let n = syncs.len() as f64;
    let mean_y = syncs.iter().map(|&(y, _)| y as f64).sum::<f64>() / n;
    let mean_sync_end = syncs.iter().map(|&(_, sync_end)| sync_end).sum::<f64>() / n;

    let (covariance, variance) =
        syncs
            .iter()
            .fold((0.0, 0.0), |(covariance, variance), &(y, sync_end)| {
                let dy = y as f64 - mean_y;
                (
                    covariance + dy * (sync_end - mean_sync_end),
                    variance + dy * dy,
                )
            });

    if variance <= 0.0 {
        return Some(single);
    }

    let line_len = covariance / variance;
    Some(LineClock::new(mean_sync_end - mean_y * line_len, line_len))
}
