use std::sync::Arc;

/// Progress notification emitted by [`Uploader::put_file`](crate::Uploader::put_file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferProgress {
    /// A new attempt started; bytes reported by earlier attempts no longer count.
    Restarted,
    /// `n` more bytes left the local buffer during the current attempt.
    Sent(u64),
}

/// Callback receiving [`TransferProgress`] updates.
///
/// May be invoked from the HTTP client's body stream, so it must not block.
pub type ProgressCallback = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Clamps a chunk of `chunk_len` bytes so the running total of the current
/// attempt never exceeds `content_length`. Returns the delta to report.
pub(crate) fn clamp_delta(sent: &mut u64, chunk_len: u64, content_length: u64) -> u64 {
    let delta = chunk_len.min(content_length.saturating_sub(*sent));
    *sent += delta;
    delta
}
