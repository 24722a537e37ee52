//! Pairing an unauthenticated session to a device.
//!
//! `qr_channel` hands the caller a finite stream of pairing events while a
//! background driver pushes the connection attempt with bounded retries.
//! The stream ends on success, failure, or window expiry; the driver also
//! stops when the consumer drops the receiver.

use std::{sync::Arc, time::Duration};

use {
    tokio::sync::mpsc,
    tracing::{debug, warn},
};

use {
    wamux_adapter::{NetworkClient, PairingEvent},
    wamux_common::GatewayError,
    wamux_resolver::phone,
};

use crate::registry::SessionRegistry;

const PAIRING_CHANNEL_CAPACITY: usize = 8;

impl SessionRegistry {
    /// Start a pairing attempt for an unauthenticated session and return
    /// its event stream.
    ///
    /// Fails with `AlreadyAuthenticated` when the session has bound
    /// credentials. A currently connected session is disconnected first so
    /// the pairing attempt starts from a clean connection.
    pub async fn qr_channel(
        &self,
        handle: &str,
    ) -> Result<mpsc::Receiver<PairingEvent>, GatewayError> {
        let client = self.client(handle)?;
        if client.is_authenticated() {
            return Err(GatewayError::AlreadyAuthenticated(handle.to_string()));
        }
        if client.is_connected() {
            if let Err(e) = client.disconnect().await {
                warn!(account_id = handle, error = %e, "disconnect before pairing failed");
            }
        }

        let source = client
            .qr_channel()
            .await
            .map_err(GatewayError::upstream)?;
        let (tx, rx) = mpsc::channel(PAIRING_CHANNEL_CAPACITY);
        self.mark_active(handle);

        tokio::spawn(drive_pairing(
            handle.to_string(),
            client,
            source,
            tx,
            self.config.pair_attempts,
            self.config.pair_retry(),
            self.config.pair_window(),
        ));
        Ok(rx)
    }

    /// Request a phone-number link code instead of a QR code.
    pub async fn pair_phone(&self, handle: &str, phone: &str) -> Result<String, GatewayError> {
        let client = self.client(handle)?;
        if client.is_authenticated() {
            return Err(GatewayError::AlreadyAuthenticated(handle.to_string()));
        }
        let digits = phone::strip_separators(phone);
        if !phone::is_digits(&digits) {
            return Err(GatewayError::InvalidAddress(format!(
                "{phone:?} is not a dialable phone number"
            )));
        }
        self.mark_active(handle);
        client
            .pair_phone(&digits)
            .await
            .map_err(GatewayError::upstream)
    }
}

/// Forward pairing events to the consumer while retrying the connection in
/// the background. Ends on a terminal event, source closure, window expiry,
/// or consumer drop.
async fn drive_pairing(
    handle: String,
    client: Arc<dyn NetworkClient>,
    mut source: mpsc::Receiver<PairingEvent>,
    tx: mpsc::Sender<PairingEvent>,
    attempts: u32,
    retry_delay: Duration,
    window: Duration,
) {
    let connector = {
        let client = Arc::clone(&client);
        let handle = handle.clone();
        tokio::spawn(async move {
            for attempt in 1..=attempts {
                match client.connect().await {
                    Ok(()) => return,
                    Err(e) => {
                        warn!(
                            account_id = %handle,
                            attempt,
                            max_attempts = attempts,
                            error = %e,
                            "pairing connect attempt failed"
                        );
                    }
                }
                if attempt < attempts {
                    tokio::time::sleep(retry_delay).await;
                }
            }
        })
    };

    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                debug!(account_id = %handle, "pairing window elapsed");
                let _ = tx.send(PairingEvent::Timeout).await;
                break;
            }
            event = source.recv() => match event {
                Some(event) => {
                    let terminal = event.is_terminal();
                    if tx.send(event).await.is_err() {
                        // Consumer stopped reading; cancel the attempt.
                        debug!(account_id = %handle, "pairing consumer dropped");
                        break;
                    }
                    if terminal {
                        break;
                    }
                }
                None => {
                    debug!(account_id = %handle, "pairing source closed");
                    break;
                }
            },
        }
    }
    connector.abort();
}
