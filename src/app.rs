use crate::agent::PlaceholderAgent;
use crate::config::{AppConfig, HTTPConfig};
use crate::http::{create_app, HttpState};
use crate::relay::MessageRelay;
use crate::whatsapp::WhatsAppClient;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::log::{error, info, warn};

#[cfg(feature = "sentry")]
pub type SentryGuard = Option<sentry::ClientInitGuard>;

#[cfg(not(feature = "sentry"))]
pub type SentryGuard = Option<()>;

pub struct AppHandles {
    server: JoinHandle<()>,
    _sentry_guard: SentryGuard,
}
impl AppHandles {
    pub fn new(config: AppConfig, _sentry_guard: SentryGuard) -> Result<AppHandles> {
        let client = WhatsAppClient::new(&config.whatsapp)
            .context("Failed to create WhatsApp client, check ACCESS_TOKEN and PHONE_NUMBER_ID")?;
        info!("Sending replies through {}", client.messages_url());

        if config.whatsapp.verify_token.is_none() {
            warn!("No webhook verify token configured (WEBHOOK_TOKEN), webhook verification will always fail!");
        }

        let state = HttpState {
            relay: MessageRelay::new(client, Arc::new(PlaceholderAgent)),
            verify_token: config.whatsapp.verify_token,
        };
        let server = Self::start_http_server(config.http, state, _sentry_guard.is_some())?;

        Ok(AppHandles {
            server,
            _sentry_guard,
        })
    }

    /// Runs until the HTTP server stops or a shutdown signal is received.
    pub async fn run(self) {
        info!("Starting task: HTTP Server");
        tokio::select! {
            result = self.server => match result {
                Ok(_) => error!("HTTP Server task completed!"),
                Err(e) => error!("HTTP Server task failed: {e:?}!"),
            },
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => info!("Received shutdown signal, stopping"),
                Err(e) => error!("Failed to listen for shutdown signal: {e}"),
            },
        }
    }

    fn start_http_server(
        config: HTTPConfig,
        state: HttpState,
        _sentry_enabled: bool,
    ) -> Result<JoinHandle<()>> {
        let address = config.address;
        let app = create_app(&config, state, _sentry_enabled)?;

        let handle = tokio::spawn(async move {
            let result = match config.tls {
                Some(_tls_config) => {
                    #[cfg(any(feature = "tls-rustls", feature = "tls-native"))]
                    {
                        info!("Starting HTTPS (secure) server on {address}");

                        #[cfg(feature = "tls-rustls")]
                        {
                            let _ = rustls::crypto::CryptoProvider::install_default(
                                rustls::crypto::aws_lc_rs::default_provider(),
                            );
                            match axum_server::tls_rustls::RustlsConfig::from_pem_file(
                                &_tls_config.certificate_path,
                                &_tls_config.key_path,
                            )
                            .await
                            {
                                Ok(tls) => axum_server::bind_rustls(address, tls)
                                    .serve(app.into_make_service())
                                    .await
                                    .map_err(anyhow::Error::from),
                                Err(e) => Err(anyhow::Error::from(e)
                                    .context("Failed to load rustls TLS certificates")),
                            }
                        }

                        #[cfg(all(feature = "tls-native", not(feature = "tls-rustls")))]
                        {
                            match axum_server::tls_openssl::OpenSSLConfig::from_pem_file(
                                &_tls_config.certificate_path,
                                &_tls_config.key_path,
                            ) {
                                Ok(tls) => axum_server::bind_openssl(address, tls)
                                    .serve(app.into_make_service())
                                    .await
                                    .map_err(anyhow::Error::from),
                                Err(e) => Err(anyhow::Error::from(e)
                                    .context("Failed to load openssl TLS certificates")),
                            }
                        }
                    }

                    #[cfg(not(any(feature = "tls-rustls", feature = "tls-native")))]
                    Err(anyhow::anyhow!(
                        "HTTP Server TLS configuration provided but no TLS features enabled. Compile with a TLS backend feature!"
                    ))
                }
                None => {
                    info!("Starting HTTP (insecure) server on {address}");
                    axum_server::bind(address)
                        .serve(app.into_make_service())
                        .await
                        .map_err(anyhow::Error::from)
                }
            };

            if let Err(e) = result {
                error!("Server error: {e:?}");
            }
        });

        Ok(handle)
    }
}
