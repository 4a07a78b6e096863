use chrono::{DateTime, Utc};
use common::{
    error::{GpsError, Result},
    position::Position,
    reading::Reading,
    request::{AccessState, AccuracyLevel, ListenerRequest},
};
use module_core::platform::{LocationPlatform, PlatformSubscription};
use std::{
    io::{Error, ErrorKind},
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

/// Settings of a [`ConstantSource`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantSourceConfig {
    /// The constant velocity in meters per second.
    pub velocity: f64,
    /// The time between two readings of a subscription.
    pub interval: Duration,
    /// The access state the source reports for every request.
    pub access: AccessState,
}

impl Default for ConstantSourceConfig {
    fn default() -> Self {
        ConstantSourceConfig {
            velocity: 10.0,
            interval: Duration::from_secs(1),
            access: AccessState::Available,
        }
    }
}

/// A route segment in the UTM zone of its start point.
#[derive(Debug, Clone, Copy)]
struct Segment {
    easting: f64,
    northing: f64,
    zone: u8,
    zone_letter: char,
    direction: (f64, f64),
    length: f64,
    heading: f64,
}

/// The position on a closed route, the segment after the last one leads back to the first point.
#[derive(Debug)]
struct Route {
    segments: Vec<Segment>,
    total_length: f64,
    segment: usize,
    progress: f64,
}

impl Route {
    fn new(positions: &[Position]) -> std::result::Result<Self, Error> {
        if positions.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "positions parameter is empty",
            ));
        }
        let mut segments = Vec::with_capacity(positions.len());
        for (index, start) in positions.iter().enumerate() {
            let end = &positions[(index + 1) % positions.len()];
            segments.push(convert_segment(start, end)?);
        }
        let total_length = segments.iter().map(|s| s.length).sum();
        Ok(Route {
            segments,
            total_length,
            segment: 0,
            progress: 0.0,
        })
    }

    /// Moves `distance` meters along the route.
    fn advance(&mut self, distance: f64) {
        if self.total_length <= 0.0 || !distance.is_finite() {
            return;
        }
        let mut remaining = distance % self.total_length;
        loop {
            let left_on_segment = self.segments[self.segment].length - self.progress;
            if remaining < left_on_segment {
                self.progress += remaining;
                return;
            }
            remaining -= left_on_segment;
            self.progress = 0.0;
            self.segment = (self.segment + 1) % self.segments.len();
        }
    }

    fn position(&self) -> std::result::Result<(Position, f64), GpsError> {
        let segment = &self.segments[self.segment];
        let easting = segment.easting + segment.direction.0 * self.progress;
        let northing = segment.northing + segment.direction.1 * self.progress;
        let (latitude, longitude) =
            wsg84_utm_to_lat_lon(easting, northing, segment.zone, segment.zone_letter)
                .map_err(|e| GpsError::Platform(format!("UTM conversion failed: {e:?}")))?;
        Ok((Position::new(latitude, longitude), segment.heading))
    }

    fn reading(
        &self,
        accuracy: AccuracyLevel,
        velocity: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<Reading> {
        let (position, heading) = self.position()?;
        let speed = if self.total_length > 0.0 { velocity } else { 0.0 };
        Ok(Reading::new(position, timestamp)
            .with_position_accuracy(accuracy.desired_accuracy_meters())
            .with_heading(heading, 0.0)
            .with_speed(speed))
    }
}

fn convert_segment(start: &Position, end: &Position) -> std::result::Result<Segment, Error> {
    if !start.is_valid() {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!(
                "Position lat: {}, long: {} is not a valid coordinate",
                start.latitude, start.longitude
            ),
        ));
    }
    let zone = lat_lon_to_zone_number(start.latitude, start.longitude);
    let Some(zone_letter) = lat_to_zone_letter(start.latitude) else {
        return Err(Error::new(
            ErrorKind::InvalidData,
            format!(
                "Position lat: {}, long: {} can't converted to UTM zone",
                start.latitude, start.longitude
            ),
        ));
    };
    let (northing, easting, _) = to_utm_wgs84(start.latitude, start.longitude, zone);
    let (end_northing, end_easting, _) = to_utm_wgs84(end.latitude, end.longitude, zone);
    let (delta_east, delta_north) = (end_easting - easting, end_northing - northing);
    let length = (delta_east * delta_east + delta_north * delta_north).sqrt();
    let direction = if length > 0.0 {
        (delta_east / length, delta_north / length)
    } else {
        (0.0, 0.0)
    };
    Ok(Segment {
        easting,
        northing,
        zone,
        zone_letter,
        direction,
        length,
        heading: delta_east.atan2(delta_north).to_degrees().rem_euclid(360.0),
    })
}

/// A location platform that drives along a fixed route with a constant velocity.
///
/// Every subscription reports one reading per configured interval. The route
/// is closed: after the last position the source drives back to the first one.
pub struct ConstantSource {
    route: Arc<Mutex<Route>>,
    config: ConstantSourceConfig,
}

impl ConstantSource {
    /// Creates a new source for the route `positions`.
    ///
    /// # Errors
    ///
    /// `ErrorKind::InvalidData` if `positions` is empty or contains coordinates
    /// that can't be converted to UTM. `ErrorKind::InvalidInput` if the interval
    /// is zero or the velocity is negative or not finite.
    pub fn new(positions: &[Position], config: ConstantSourceConfig) -> std::io::Result<Self> {
        if config.interval.is_zero() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "reading interval must be greater than zero",
            ));
        }
        if !config.velocity.is_finite() || config.velocity < 0.0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("velocity {} is not a non-negative number", config.velocity),
            ));
        }
        let route = Route::new(positions)?;
        debug!(
            "Constant source route with {} segments and {:.1}m length",
            route.segments.len(),
            route.total_length
        );
        Ok(ConstantSource {
            route: Arc::new(Mutex::new(route)),
            config,
        })
    }
}

#[async_trait::async_trait]
impl LocationPlatform for ConstantSource {
    async fn request_access(&self, request: &ListenerRequest) -> Result<AccessState> {
        debug!(
            "Constant source grants {} for {:?}",
            self.config.access, request.background_mode
        );
        Ok(self.config.access)
    }

    async fn access_state(&self, _request: &ListenerRequest) -> Result<AccessState> {
        Ok(self.config.access)
    }

    async fn subscribe(&self, request: &ListenerRequest) -> Result<PlatformSubscription> {
        let (sender, receiver) = mpsc::channel(16);
        let route = self.route.clone();
        let config = self.config;
        let accuracy = request.accuracy;
        let producer = tokio::spawn(async move {
            constant_position_task(route, config, accuracy, sender).await;
        });
        Ok(PlatformSubscription::new(receiver, producer))
    }

    async fn current_position(&self, accuracy: AccuracyLevel) -> Result<Reading> {
        let route = self.route.lock().unwrap_or_else(|e| e.into_inner());
        route.reading(accuracy, self.config.velocity, Utc::now())
    }
}

async fn constant_position_task(
    route: Arc<Mutex<Route>>,
    config: ConstantSourceConfig,
    accuracy: AccuracyLevel,
    sender: mpsc::Sender<Reading>,
) {
    let mut timer = tokio::time::interval(config.interval);
    let distance_per_tick = config.velocity * config.interval.as_secs_f64();
    loop {
        timer.tick().await;
        let reading = {
            let mut route = route.lock().unwrap_or_else(|e| e.into_inner());
            let reading = route.reading(accuracy, config.velocity, Utc::now());
            route.advance(distance_per_tick);
            reading
        };
        match reading {
            Ok(reading) => {
                if sender.send(reading).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!("Failed to compute simulated position. Error: {e}"),
        }
    }
    debug!("Constant position task finished");
}
