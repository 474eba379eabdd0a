//! Bridges a watch subscription onto a transport's outbound channel.

use tokio::sync::mpsc;
use tracing::debug;

use rszed_domain::RevisionCodec;
use rszed_server::handlers::watch::{WatchError, WatchResponse, WatchSubscription};

/// Runs `subscription` on a worker task and returns the transport-side receiver.
///
/// Every forwarded response is converted with `on_response`. If the watch
/// fails, one final item built by `on_error` is sent after all responses.
/// Dropping the returned receiver stops the worker and closes the feed.
/// Cancelling the subscription's token ends the worker even while the
/// receiver is held but not read; the terminal item is then delivered only
/// if the channel has room for it.
pub fn spawn_watch<C, T, R, E>(
    subscription: WatchSubscription<C>,
    buffer: usize,
    on_response: R,
    on_error: E,
) -> mpsc::Receiver<T>
where
    C: RevisionCodec,
    T: Send + 'static,
    R: Fn(WatchResponse) -> T + Send + 'static,
    E: FnOnce(WatchError) -> T + Send + 'static,
{
    let buffer = buffer.max(1);
    let (out_tx, out_rx) = mpsc::channel(buffer);
    let (sink, mut responses) = mpsc::channel(buffer);
    let cancel = subscription.cancel_token();

    tokio::spawn(async move {
        let relay_tx = out_tx.clone();
        let relay_cancel = cancel.clone();
        let relay = async move {
            loop {
                tokio::select! {
                    _ = relay_tx.closed() => break,
                    response = responses.recv() => match response {
                        Some(response) => {
                            let delivered = tokio::select! {
                                biased;
                                sent = relay_tx.send(on_response(response)) => sent.is_ok(),
                                _ = relay_cancel.cancelled() => false,
                            };
                            if !delivered {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            // `responses` drops here, which the subscription sees as the client leaving.
        };

        let (outcome, ()) = tokio::join!(subscription.run(sink), relay);

        if let Err(err) = outcome {
            let item = on_error(err);
            let delivered = if cancel.is_cancelled() {
                out_tx.try_send(item).is_ok()
            } else {
                tokio::select! {
                    biased;
                    sent = out_tx.send(item) => sent.is_ok(),
                    _ = cancel.cancelled() => false,
                }
            };
            if !delivered {
                debug!("watch client gone or stalled before terminal error was delivered");
            }
        }
    });

    out_rx
}
