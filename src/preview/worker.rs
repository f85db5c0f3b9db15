use std::thread::{self, JoinHandle};

use crate::preview::{DecodeJob, DecodeOutcome, decode};

/// Decodes `job` on its own thread and hands the outcome to `on_done`.
///
/// A job cancelled before or during decoding reports nothing. Outcomes that
/// do arrive may still be stale; the receiver checks the ticket.
pub fn spawn_decode<F>(job: DecodeJob, on_done: F) -> JoinHandle<()>
where
    F: FnOnce(DecodeOutcome) + Send + 'static,
{
    thread::spawn(move || {
        if job.cancel.is_cancelled() {
            tracing::debug!(ticket = job.ticket.0, "decode cancelled before start");
            return;
        }

        let result = decode(job.kind, &job.payload, job.max_text_bytes);
        if let Err(err) = &result {
            tracing::warn!(node = %job.node_id, "preview decode failed: {err}");
        }

        if job.cancel.is_cancelled() {
            tracing::debug!(ticket = job.ticket.0, "decode cancelled, dropping result");
            return;
        }

        on_done(DecodeOutcome {
            ticket: job.ticket,
            node_id: job.node_id,
            result,
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;

    use crate::model::node::NodeId;
    use crate::preview::{CancelFlag, Decoded, PreviewKind, PreviewTicket};

    fn job(kind: PreviewKind, bytes: &[u8]) -> DecodeJob {
        DecodeJob {
            ticket: PreviewTicket(7),
            node_id: NodeId::from("f1"),
            kind,
            payload: Arc::from(bytes),
            max_text_bytes: 1024,
            cancel: CancelFlag::default(),
        }
    }

    #[test]
    fn reports_outcome_through_callback() {
        let (tx, rx) = mpsc::channel();
        spawn_decode(job(PreviewKind::Text, b"hello"), move |outcome| {
            let _ = tx.send(outcome);
        })
        .join()
        .unwrap();

        let outcome = rx.recv().unwrap();
        assert_eq!(outcome.ticket, PreviewTicket(7));
        assert!(matches!(outcome.result, Ok(Decoded::Text { ref text, .. }) if text == "hello"));
    }

    #[test]
    fn failures_are_reported_not_swallowed() {
        let (tx, rx) = mpsc::channel();
        spawn_decode(job(PreviewKind::Docx, b"not a zip"), move |outcome| {
            let _ = tx.send(outcome);
        })
        .join()
        .unwrap();

        assert!(rx.recv().unwrap().result.is_err());
    }

    #[test]
    fn cancelled_jobs_stay_silent() {
        let (tx, rx) = mpsc::channel();
        let job = job(PreviewKind::Text, b"hello");
        job.cancel.cancel();
        spawn_decode(job, move |outcome| {
            let _ = tx.send(outcome);
        })
        .join()
        .unwrap();

        assert!(rx.try_recv().is_err());
    }
}
