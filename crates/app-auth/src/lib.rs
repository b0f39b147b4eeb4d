//! Authentication for the tea taster app.
//!
//! The pieces, bottom to top: [`SessionStore`] owns the vault and the
//! in-memory session; [`AuthStore`] holds the reduced auth state;
//! [`Authenticator`] drives login, logout, and unlock; [`ApiClient`]
//! authorizes data service requests with the current token.

mod api;
mod authenticator;
mod bootstrap;
mod error;
mod models;
mod session;
mod state;

pub use api::{ApiClient, AuthApi};
pub use bootstrap::{build_stack, AuthStack};
pub use authenticator::{Authenticator, CredentialGateway, LOGIN_FAILED_MESSAGE};
pub use error::{AuthError, AuthResult};
pub use models::{LoginGrant, User};
pub use session::SessionStore;
pub use state::{reduce, AuthAction, AuthState, AuthStatus, AuthStore};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted fakes and a canned HTTP responder for the auth tests.

    use session_vault::{
        AuthMode, LockEvent, Session, StorageError, VaultAdapter, VaultError, VaultResult,
    };
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::sync::{broadcast, mpsc};

    /// Vault fake with scriptable restore and login outcomes.
    pub struct ScriptedVault {
        stored: Mutex<Option<(Session, AuthMode)>>,
        fail_login: Mutex<Option<VaultError>>,
        fail_restore: Mutex<Option<VaultError>>,
        declines: Mutex<u32>,
        biometrics: Mutex<bool>,
        events: broadcast::Sender<LockEvent>,
    }

    impl ScriptedVault {
        pub fn new() -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                stored: Mutex::new(None),
                fail_login: Mutex::new(None),
                fail_restore: Mutex::new(None),
                declines: Mutex::new(0),
                biometrics: Mutex::new(false),
                events,
            })
        }

        /// A vault that already holds a session, as after a relaunch.
        pub fn with_stored(username: impl Into<String>, token: impl Into<String>) -> Arc<Self> {
            let vault = Self::new();
            *vault.stored.lock().unwrap() = Some((
                Session::new(token, username),
                AuthMode::PasscodeOnly,
            ));
            vault
        }

        pub fn fail_next_login(&self, err: VaultError) {
            *self.fail_login.lock().unwrap() = Some(err);
        }

        pub fn fail_next_restore(&self, err: VaultError) {
            *self.fail_restore.lock().unwrap() = Some(err);
        }

        /// The next restore behaves as if the user backed out of the gate.
        pub fn decline_next_restore(&self) {
            *self.declines.lock().unwrap() += 1;
        }

        pub fn has_stored_session_now(&self) -> bool {
            self.stored.lock().unwrap().is_some()
        }

        pub fn set_biometrics(&self, available: bool) {
            *self.biometrics.lock().unwrap() = available;
        }

        /// Rewrite the stored session's unlock mode in place.
        pub fn set_mode(&self, mode: AuthMode) {
            if let Some((_, stored_mode)) = self.stored.lock().unwrap().as_mut() {
                *stored_mode = mode;
            }
        }
    }

    impl VaultAdapter for ScriptedVault {
        fn restore(&self) -> VaultResult<Option<Session>> {
            if let Some(err) = self.fail_restore.lock().unwrap().take() {
                return Err(err);
            }
            let mut declines = self.declines.lock().unwrap();
            if *declines > 0 {
                *declines -= 1;
                return Ok(None);
            }
            Ok(self
                .stored
                .lock()
                .unwrap()
                .as_ref()
                .map(|(session, _)| session.clone()))
        }

        fn login(&self, session: &Session, mode: AuthMode) -> VaultResult<()> {
            if let Some(err) = self.fail_login.lock().unwrap().take() {
                return Err(err);
            }
            *self.stored.lock().unwrap() = Some((session.clone(), mode));
            Ok(())
        }

        fn logout(&self) -> VaultResult<()> {
            *self.stored.lock().unwrap() = None;
            Ok(())
        }

        fn lock(&self) {
            let saved = self.has_stored_session_now();
            let _ = self.events.send(LockEvent {
                saved,
                timeout: false,
            });
        }

        fn has_stored_session(&self) -> bool {
            self.has_stored_session_now()
        }

        fn auth_mode(&self) -> VaultResult<AuthMode> {
            self.stored
                .lock()
                .unwrap()
                .as_ref()
                .map(|(_, mode)| *mode)
                .ok_or_else(|| StorageError::NotFound("vault_meta".to_string()).into())
        }

        fn is_biometrics_available(&self) -> bool {
            *self.biometrics.lock().unwrap()
        }

        fn lock_events(&self) -> broadcast::Receiver<LockEvent> {
            self.events.subscribe()
        }
    }

    /// Serve the same canned response to every connection on a local port.
    ///
    /// Returns the base URL and a channel of raw request texts (head plus
    /// body) for asserting on methods, paths, and headers.
    pub async fn canned_http(
        status: &str,
        body: &str,
    ) -> (String, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let tx = tx.clone();
                let response = response.clone();
                tokio::spawn(async move {
                    let (read, mut write) = socket.split();
                    let mut reader = BufReader::new(read);

                    let mut request = String::new();
                    let mut content_length = 0usize;
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                            break;
                        }
                        let lower = line.to_ascii_lowercase();
                        if let Some(value) = lower.strip_prefix("content-length:") {
                            content_length = value.trim().parse().unwrap_or(0);
                        }
                        let done = line == "\r\n";
                        request.push_str(&line);
                        if done {
                            break;
                        }
                    }
                    if content_length > 0 {
                        let mut body = vec![0u8; content_length];
                        if reader.read_exact(&mut body).await.is_ok() {
                            request.push_str(&String::from_utf8_lossy(&body));
                        }
                    }

                    let _ = tx.send(request);
                    let _ = write.write_all(response.as_bytes()).await;
                });
            }
        });

        (format!("http://{}", addr), rx)
    }
}
