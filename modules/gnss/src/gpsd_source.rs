use chrono::{DateTime, Utc};
use common::{
    error::{GpsError, Result},
    position::Position,
    reading::Reading,
    request::{AccessState, AccuracyLevel, ListenerRequest},
};
use futures::StreamExt;
use gpsd_proto::{Mode, Tpv};
use module_core::platform::{LocationPlatform, PlatformSubscription};
use serde::Deserialize;
use std::{
    io::{self, Error, ErrorKind},
    net::SocketAddr,
    str::FromStr,
    time::Duration,
};
use tokio::{io::AsyncWriteExt, net::TcpStream, sync::mpsc};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, info};

type GpsdConnection = Framed<TcpStream, LinesCodec>;

/// Upper bound for opening a connection to the daemon.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// TPV members that are read in addition to the ones of [`Tpv`].
#[derive(Debug, Default, Deserialize)]
struct TpvDetails {
    class: String,
    alt: Option<f64>,
    #[serde(rename = "altHAE")]
    alt_hae: Option<f64>,
    track: Option<f64>,
    eph: Option<f64>,
    epd: Option<f64>,
}

/// Converts a GPSD TPV report into a reading.
///
/// Returns `None` for other reports and for TPV reports without a 2D or 3D fix,
/// position or time.
fn tpv_to_reading(line: &str) -> Option<Reading> {
    let details = serde_json::from_str::<TpvDetails>(line).ok()?;
    if details.class != "TPV" {
        return None;
    }
    let tpv = serde_json::from_str::<Tpv>(line).ok()?;
    if let Mode::NoFix = tpv.mode {
        return None;
    }
    let latitude = tpv.lat?;
    let longitude = tpv.lon?;
    let time = tpv.time.as_ref()?;
    let timestamp = DateTime::<Utc>::from_str(time).ok()?;
    let speed = tpv.speed.map_or(0.0, f64::from);
    Some(
        Reading::new(Position::new(latitude, longitude), timestamp)
            .with_altitude(details.alt_hae.or(details.alt).unwrap_or(0.0))
            .with_position_accuracy(details.eph.unwrap_or(0.0))
            .with_heading(details.track.unwrap_or(0.0), details.epd.unwrap_or(0.0))
            .with_speed(speed),
    )
}

async fn gpsd_reader(mut connection: GpsdConnection, sender: mpsc::Sender<Reading>) {
    while let Some(result) = connection.next().await {
        match result {
            Ok(ref line) => {
                if let Some(reading) = tpv_to_reading(line)
                    && sender.send(reading).await.is_err()
                {
                    break;
                }
            }
            Err(e) => {
                error!("GPSD receive error {e:?}");
                break;
            }
        }
    }
    debug!("GPSD reader finished");
}

/// GPSD daemon based location platform.
///
/// GPSD has no permission model, the access state reflects whether the daemon
/// accepts connections. Every subscription and every one-shot request uses its
/// own connection.
pub struct GpsdSource {
    address: SocketAddr,
}

impl GpsdSource {
    /// Creates a new source for the GPSD daemon at `address`, e.g. `127.0.0.1:2947`.
    ///
    /// No connection is opened until access is checked or a position is requested.
    pub fn new(address: &str) -> io::Result<Self> {
        let address: SocketAddr = match address.parse() {
            Ok(addr) => addr,
            Err(e) => return Err(Error::new(ErrorKind::InvalidInput, e)),
        };
        Ok(GpsdSource { address })
    }

    async fn open_stream(&self) -> io::Result<TcpStream> {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(self.address)).await {
            Ok(result) => result,
            Err(_) => Err(Error::new(
                ErrorKind::TimedOut,
                format!("GPSD at {} didn't answer within {:?}", self.address, CONNECT_TIMEOUT),
            )),
        }
    }

    async fn connect(&self) -> io::Result<GpsdConnection> {
        let mut stream = self.open_stream().await?;
        stream
            .write_all(gpsd_proto::ENABLE_WATCH_CMD.as_bytes())
            .await?;
        Ok(Framed::new(stream, LinesCodec::new()))
    }

    async fn probe(&self) -> Result<AccessState> {
        match self.open_stream().await {
            Ok(_) => Ok(AccessState::Available),
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => Ok(AccessState::Disabled),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl LocationPlatform for GpsdSource {
    async fn request_access(&self, request: &ListenerRequest) -> Result<AccessState> {
        let access = self.probe().await?;
        info!(
            "GPSD at {} is {} for {:?} background mode",
            self.address, access, request.background_mode
        );
        Ok(access)
    }

    async fn access_state(&self, _request: &ListenerRequest) -> Result<AccessState> {
        self.probe().await
    }

    async fn subscribe(&self, request: &ListenerRequest) -> Result<PlatformSubscription> {
        debug!(
            "GPSD reports with the receiver accuracy, requested {}",
            request.accuracy
        );
        let connection = self.connect().await?;
        let (sender, receiver) = mpsc::channel(16);
        let producer = tokio::spawn(async move { gpsd_reader(connection, sender).await });
        Ok(PlatformSubscription::new(receiver, producer))
    }

    async fn current_position(&self, _accuracy: AccuracyLevel) -> Result<Reading> {
        let mut connection = self.connect().await?;
        while let Some(result) = connection.next().await {
            match result {
                Ok(ref line) => {
                    if let Some(reading) = tpv_to_reading(line) {
                        return Ok(reading);
                    }
                }
                Err(e) => return Err(GpsError::Platform(e.to_string())),
            }
        }
        Err(GpsError::Unavailable(
            "GPSD closed the connection before a fix was reported".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::tpv_to_reading;

    #[test]
    fn sky_report_is_ignored() {
        let sky = r#"{"class":"SKY","device":"/dev/pts/1","satellites":[]}"#;
        assert_eq!(tpv_to_reading(sky), None);
    }

    #[test]
    fn tpv_without_fix_is_ignored() {
        let tpv = r#"{"class":"TPV","mode":1,"time":"2005-06-08T10:34:48.283Z"}"#;
        assert_eq!(tpv_to_reading(tpv), None);
    }
}
