//! Pure cursor bound checks shared by playback and the transport controls.

/// Clamps a requested index into `[0, len - 1]`; 0 when the timeline is empty.
#[must_use]
pub fn clamp_index(index: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    usize::try_from(index).map_or(0, |i| i.min(len - 1))
}

/// True when stepping back is possible.
#[must_use]
pub fn can_step_back(index: usize) -> bool {
    index > 0
}

/// True when stepping forward is possible.
#[must_use]
pub fn can_step_forward(index: usize, len: usize) -> bool {
    index + 1 < len
}

/// True when playback should stop: nothing left to advance to.
#[must_use]
pub fn should_auto_stop(index: usize, len: usize) -> bool {
    len == 0 || index + 1 >= len
}
