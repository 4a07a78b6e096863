mod cli;

use clap::{CommandFactory, Parser};
use cli::{Cli, Command, ListenArgs};
use common::{
    error::GpsError,
    position::Position,
    reading::Reading,
    request::{AccuracyLevel, BackgroundMode, ListenerRequest},
};
use dirs::data_local_dir;
use futures::StreamExt;
use gnss::{
    constant_source::{ConstantSource, ConstantSourceConfig},
    gpsd_source::GpsdSource,
};
use gps_manager::{GpsManager, LocationManager, ManagerConfig};
use module_core::{Event, EventBus, EventKind, Module, platform::LocationPlatform};
use notification::{BackgroundNotification, TracingPresenter};
use std::{path::PathBuf, str::FromStr, time::Duration};
use storage::{FileStore, GpsPreferences};
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn read_route_file(file_path: &str) -> Result<Vec<Position>, ()> {
    let mut rdr = csv::Reader::from_path(file_path).map_err(|e| {
        error!("Failed to open route file {}. Error: {}", file_path, e);
    })?;
    let mut positions = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| error!("Invalid route record. Error: {}", e))?;
        let (Some(longitude), Some(latitude)) = (record.get(0), record.get(1)) else {
            error!("Route record {:?} needs longitude and latitude", record);
            return Err(());
        };
        let (Ok(longitude), Ok(latitude)) = (
            f64::from_str(longitude.trim()),
            f64::from_str(latitude.trim()),
        ) else {
            error!("Route record {:?} is not a coordinate", record);
            return Err(());
        };
        positions.push(Position::new(latitude, longitude));
    }
    debug!("length of positions: {}", positions.len());
    Ok(positions)
}

fn get_storage_dir() -> Result<PathBuf, ()> {
    let mut storage_dir = data_local_dir().ok_or_else(|| {
        error!("Could not determine local data directory");
    })?;
    storage_dir.push("gps_manager");
    Ok(storage_dir)
}

fn print_help() {
    if let Err(e) = Cli::command().print_help() {
        error!("Failed to print help. Error: {}", e);
    }
}

fn print_reading(reading: &Reading) {
    println!(
        "lat: {:.6}, lon: {:.6}, alt: {:.1}m, accuracy: {:.1}m, heading: {:.1}° (±{:.1}°), speed: {:.2}m/s, time: {}",
        reading.latitude(),
        reading.longitude(),
        reading.altitude,
        reading.position_accuracy,
        reading.heading,
        reading.heading_accuracy,
        reading.speed,
        reading.timestamp
    );
}

fn print_retrieved(reading: Option<Reading>) {
    match reading {
        Some(reading) => print_reading(&reading),
        None => println!("Could not get GPS coordinates"),
    }
}

/// The front-end state around the manager: persisted preferences and the Ctrl-C signal.
struct Frontend<M: GpsManager> {
    manager: M,
    store: FileStore,
    preferences: GpsPreferences,
    shutdown: CancellationToken,
}

impl<M: GpsManager> Frontend<M> {
    fn request(&mut self, args: &ListenArgs) -> ListenerRequest {
        if let Some(accuracy) = args.accuracy {
            self.preferences.accuracy = accuracy.into();
        }
        self.preferences.background_mode =
            BackgroundMode::from_toggles(args.background, args.realtime);
        self.save_preferences();
        self.preferences.request()
    }

    fn save_preferences(&mut self) {
        if let Err(e) = self.preferences.save(&mut self.store) {
            error!(
                "Failed to store preferences in {}. Error: {}",
                self.store.path().to_string_lossy(),
                e
            );
        }
    }

    async fn access(&mut self, args: &ListenArgs) -> Result<(), ()> {
        let request = self.request(args);
        match self.manager.request_access(request).await {
            Ok(access) => {
                println!("{access}");
                Ok(())
            }
            Err(e) => {
                error!("Failed to request location access. Error: {}", e);
                Err(())
            }
        }
    }

    async fn listen(&mut self, args: &ListenArgs, count: Option<usize>) -> Result<(), ()> {
        let request = self.request(args);
        let access = self.manager.request_access(request).await.map_err(|e| {
            error!("Failed to request location access. Error: {}", e);
        })?;
        if !access.is_available() {
            println!("Insufficient permissions - {access}");
            return Err(());
        }
        let listener = match self.manager.start_listener(request).await {
            Ok(listener) => listener,
            Err(GpsError::Permission(state)) => {
                println!("Insufficient permissions - {state}");
                return Err(());
            }
            Err(e) => {
                error!("Failed to start listener. Error: {}", e);
                return Err(());
            }
        };
        info!(
            "Listening with accuracy {} and background mode {}",
            listener.accuracy, listener.background_mode
        );

        let mut readings = self.manager.readings();
        let mut received = 0;
        loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => None,
                reading = readings.next() => reading,
            };
            let Some(reading) = next else {
                break;
            };
            print_reading(&reading);
            received += 1;
            if count.is_some_and(|count| received >= count) {
                break;
            }
        }
        self.manager.stop_listener().await;
        info!("Listener stopped after {} readings", received);
        Ok(())
    }

    async fn current(&self) -> Result<(), ()> {
        let reading = self.manager.get_current_position().await;
        self.print_result(reading)
    }

    async fn last_or_current(&self) -> Result<(), ()> {
        let reading = self.manager.get_last_reading_or_current_position().await;
        self.print_result(reading)
    }

    fn print_result(&self, reading: Result<Reading, GpsError>) -> Result<(), ()> {
        match reading {
            Ok(reading) => {
                print_reading(&reading);
                Ok(())
            }
            Err(e) => {
                debug!("Position request failed. Error: {}", e);
                print_retrieved(None);
                Err(())
            }
        }
    }

    fn set_title(&mut self, title: &str) {
        self.manager.set_title(title);
        self.preferences.title = self.manager.title();
        self.save_preferences();
    }

    fn set_message(&mut self, message: &str) {
        self.manager.set_message(message);
        self.preferences.message = self.manager.message();
        self.save_preferences();
    }

    async fn execute(&mut self, command: &Command) -> Result<(), ()> {
        match command {
            Command::Accuracies => {
                for accuracy in AccuracyLevel::iter() {
                    println!("{accuracy}");
                }
                Ok(())
            }
            Command::Access(args) => self.access(args).await,
            Command::Listen { args, count } => self.listen(args, *count).await,
            Command::Current => self.current().await,
            Command::Last => {
                print_retrieved(self.manager.get_last_reading());
                Ok(())
            }
            Command::LastOrCurrent => self.last_or_current().await,
            Command::Title { title } => {
                self.set_title(title);
                Ok(())
            }
            Command::Message { message } => {
                self.set_message(message);
                Ok(())
            }
        }
    }
}

async fn run<P: LocationPlatform + 'static>(
    platform: P,
    cli: &Cli,
    store: FileStore,
    shutdown: CancellationToken,
) -> Result<(), ()> {
    let preferences = GpsPreferences::load(&store).unwrap_or_else(|e| {
        error!("Stored preferences are invalid, using defaults. Error: {}", e);
        GpsPreferences::default()
    });
    let eb = EventBus::default();
    let mut config = ManagerConfig::default();
    if let Some(timeout) = cli.timeout {
        config.current_position_timeout = Duration::from_secs(timeout);
    }

    let mut notification = BackgroundNotification::with_text(
        eb.context(),
        TracingPresenter,
        preferences.notification_text(),
    );
    let notification_handle = tokio::spawn(async move { notification.run().await });

    let manager = LocationManager::with_config(platform, eb.context(), config);
    manager.set_title(&preferences.title);
    manager.set_message(&preferences.message);
    let mut frontend = Frontend {
        manager,
        store,
        preferences,
        shutdown,
    };

    info!("Executing {:?}", cli.command);
    let result = frontend.execute(&cli.command).await;

    eb.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    match notification_handle.await {
        Ok(module_result) => module_result.and(result),
        Err(e) => {
            error!("Notification module failed. Error: {}", e);
            Err(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut store_path = get_storage_dir()?;
    store_path.push("preferences.json");
    let store = FileStore::open(&store_path).map_err(|e| {
        error!(
            "Failed to open preferences {}. Error: {}",
            store_path.to_string_lossy(),
            e
        );
    })?;

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || ctrlc_token.cancel()) {
        error!("Failed to install Ctrl-C handler. Error: {}", e);
    }

    if cli.gpsd {
        let gpsd = GpsdSource::new(&cli.gpsd_address).map_err(|e| {
            error!("Invalid gpsd address {}. Error: {}", cli.gpsd_address, e);
        })?;
        run(gpsd, &cli, store, shutdown).await
    } else if cli.gps_fake {
        let Some(source_file) = &cli.gps_source_file else {
            error!("Failed to create ConstantSource. Error: gps_source_file not set");
            print_help();
            return Err(());
        };
        let positions = read_route_file(source_file)?;
        let config = ConstantSourceConfig {
            velocity: cli.velocity,
            ..ConstantSourceConfig::default()
        };
        let source = ConstantSource::new(&positions, config).map_err(|e| {
            error!("Failed to create ConstantSource. Error: {}", e);
        })?;
        run(source, &cli, store, shutdown).await
    } else {
        error!("No GPS source specified. Use --gpsd or --gps-fake");
        print_help();
        Err(())
    }
}
