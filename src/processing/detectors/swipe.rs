use crate::processing::SAMPLE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    Swipe { mean: f64 },
    NoEvent { mean: f64 },
}

impl Classification {
    pub fn is_swipe(&self) -> bool {
        matches!(self, Classification::Swipe { .. })
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Classification::Swipe { mean } | Classification::NoEvent { mean } => mean,
        }
    }
}

/// Decides whether the starter side's window is a completed swipe.
///
/// The sum is always divided by `SAMPLE_SIZE`, so a window that closed
/// because the other side filled up first averages in zeros for its missing
/// samples. A swipe means the hand has moved back out to at least the
/// proximity threshold by the end of the window; a hand that lingers close
/// keeps the mean below it.
pub fn classify(samples: &[u32], threshold: u32) -> Classification {
    let sum: u64 = samples.iter().take(SAMPLE_SIZE).map(|&cm| cm as u64).sum();
    let mean = sum as f64 / SAMPLE_SIZE as f64;

    if mean >= threshold as f64 {
        Classification::Swipe { mean }
    } else {
        Classification::NoEvent { mean }
    }
}
