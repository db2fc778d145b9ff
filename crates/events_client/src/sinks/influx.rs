//! InfluxDB writers - series document over HTTP or UDP

use std::time::Duration;

use contracts::{ContractError, SeriesBatch, TimeSeriesConfig, TimeSeriesTransport, TimeSeriesWriter};
use tokio::net::UdpSocket;
use tracing::{debug, instrument};

/// Largest datagram we attempt to send (IPv4 UDP payload limit)
const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Datagram payload: a JSON array holding one series, as on the HTTP path
fn encode_body(batch: &SeriesBatch) -> Result<Vec<u8>, ContractError> {
    Ok(serde_json::to_vec(&[batch])?)
}

/// Writer posting to `/db/{database}/series`
pub struct InfluxHttpWriter {
    name: String,
    client: reqwest::Client,
    url: String,
    username: String,
    password: String,
}

impl InfluxHttpWriter {
    pub const NAME: &'static str = "influx_http";

    /// Build the HTTP client; no connection is opened until the first write
    pub fn new(config: &TimeSeriesConfig) -> Result<Self, ContractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ContractError::sink_connection(Self::NAME, e.to_string()))?;

        Ok(Self {
            name: Self::NAME.to_string(),
            client,
            url: Self::series_url(config),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn series_url(config: &TimeSeriesConfig) -> String {
        let scheme = if config.ssl { "https" } else { "http" };
        format!(
            "{scheme}://{}:{}/db/{}/series",
            config.host, config.port, config.database
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TimeSeriesWriter for InfluxHttpWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "influx_http_write",
        skip(self, batch),
        fields(series = %batch.name, rows = batch.len())
    )]
    async fn write_batch(&self, batch: &SeriesBatch) -> Result<(), ContractError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[
                ("u", self.username.as_str()),
                ("p", self.password.as_str()),
                ("time_precision", "ms"),
            ])
            .json(&[batch])
            .send()
            .await
            .map_err(|e| ContractError::sink_connection(&self.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ContractError::sink_write(
                &self.name,
                format!("HTTP {status}: {detail}"),
            ));
        }

        debug!(sink = %self.name, %status, "Series accepted");
        Ok(())
    }
}

/// Writer sending the series document as one datagram
pub struct InfluxUdpWriter {
    name: String,
    socket: UdpSocket,
}

impl InfluxUdpWriter {
    pub const NAME: &'static str = "influx_udp";

    /// Bind a local socket and connect it to `host:port`
    #[instrument(name = "influx_udp_new", skip(host))]
    pub async fn new(host: &str, port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect((host, port)).await?;

        debug!(sink = Self::NAME, target = %format!("{host}:{port}"), "UDP writer connected");

        Ok(Self {
            name: Self::NAME.to_string(),
            socket,
        })
    }
}

impl TimeSeriesWriter for InfluxUdpWriter {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "influx_udp_write",
        skip(self, batch),
        fields(series = %batch.name, rows = batch.len())
    )]
    async fn write_batch(&self, batch: &SeriesBatch) -> Result<(), ContractError> {
        let data = encode_body(batch)?;
        if data.len() > MAX_DATAGRAM_SIZE {
            return Err(ContractError::sink_write(
                &self.name,
                format!("datagram of {} bytes exceeds {MAX_DATAGRAM_SIZE}", data.len()),
            ));
        }

        let sent = self
            .socket
            .send(&data)
            .await
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;

        debug!(sink = %self.name, bytes = sent, "Sent");
        Ok(())
    }
}

/// Time-series writer selected by `TimeSeriesConfig::transport`
pub enum InfluxWriter {
    Http(InfluxHttpWriter),
    Udp(InfluxUdpWriter),
}

impl InfluxWriter {
    /// Create the writer for the configured transport
    pub async fn from_config(config: &TimeSeriesConfig) -> Result<Self, ContractError> {
        match config.transport {
            TimeSeriesTransport::Http => Ok(Self::Http(InfluxHttpWriter::new(config)?)),
            TimeSeriesTransport::Udp { port } => InfluxUdpWriter::new(&config.host, port)
                .await
                .map(Self::Udp)
                .map_err(|e| ContractError::sink_connection(InfluxUdpWriter::NAME, e.to_string())),
        }
    }
}

impl TimeSeriesWriter for InfluxWriter {
    fn name(&self) -> &str {
        match self {
            Self::Http(writer) => writer.name(),
            Self::Udp(writer) => writer.name(),
        }
    }

    async fn write_batch(&self, batch: &SeriesBatch) -> Result<(), ContractError> {
        match self {
            Self::Http(writer) => writer.write_batch(batch).await,
            Self::Udp(writer) => writer.write_batch(batch).await,
        }
    }
}
