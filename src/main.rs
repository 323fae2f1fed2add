use clap::Parser;
use log::{error, info};
use race_timer_node::clock::SystemClock;
use race_timer_node::config::{self, Config, GpioBackend, normalize_base_url, parse_sensor_list};
use race_timer_node::connectivity::{
    ConnectivitySupervisor, LinkCredentials, NmcliLink, SntpTimeSync, TimeSync,
};
use race_timer_node::error::Result;
use race_timer_node::input::{EdgeSource, SimulatedTriggers, SysfsGpio, attach_sensors};
use race_timer_node::node::RaceNode;
use race_timer_node::report::{Reporter, ReqwestTransport};
use race_timer_node::sensors::SensorBank;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[derive(Parser)]
#[command(name = "race-timer-node")]
#[command(about = "Race timing edge node: reports debounced trigger events to the timing master")]
struct Cli {
    /// Node identity reported to the master
    #[arg(long)]
    node_id: Option<u32>,

    /// Master base URL or host (e.g. 192.168.1.1)
    #[arg(long)]
    master: Option<String>,

    /// Sensors as channel:pin[:debounce_ms], comma separated
    #[arg(long)]
    sensors: Option<String>,

    /// Network interface supervised by the node
    #[arg(long)]
    interface: Option<String>,

    /// Use simulated triggers instead of sysfs GPIO
    #[arg(long)]
    simulate: bool,

    /// Mean interval of simulated triggers
    #[arg(long)]
    simulate_interval_ms: Option<u64>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::from_env()?;

    if let Some(id) = cli.node_id {
        config.node.id = id;
    }
    if let Some(master) = &cli.master {
        config.master.base_url = normalize_base_url(master);
    }
    if let Some(sensors) = &cli.sensors {
        config.sensors = parse_sensor_list(sensors)?;
    }
    if let Some(interface) = &cli.interface {
        config.network.interface = interface.clone();
    }
    if cli.simulate {
        config.gpio.backend = GpioBackend::Simulated;
    }
    if let Some(interval) = cli.simulate_interval_ms {
        config.gpio.simulate_interval_ms = interval;
    }

    config.validate()?;
    Ok(config)
}

fn main() {
    // Load .env before the runtime exists: set_var is only sound single-threaded
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if cli.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize configuration: {}", e),
        }
        return;
    }

    info!("Starting race timer node");
    info!("Configuration loaded:");
    info!("  Node ID: {}", config.node.id);
    info!("  Master: {}", config.master.base_url);
    info!("  Interface: {}", config.network.interface);
    info!("  GPIO backend: {:?}", config.gpio.backend);
    for sensor in &config.sensors {
        info!(
            "  Channel {}: pin {}, debounce {} ms",
            sensor.channel_id, sensor.pin, sensor.debounce_ms
        );
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(config)) {
        error!("Race timer node failed to start: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let clock = Arc::new(SystemClock::new());
    let sensors = Arc::new(SensorBank::from_config(&config.sensors));

    // Edge source stays alive for the lifetime of the loop
    let mut simulation_task = None;
    let mut edge_source: Box<dyn EdgeSource> = match config.gpio.backend {
        GpioBackend::Sysfs => Box::new(SysfsGpio::new(&config.gpio.sysfs_root)),
        GpioBackend::Simulated => {
            let simulation = SimulatedTriggers::new();
            if config.gpio.simulate_interval_ms > 0 {
                simulation_task = Some(
                    simulation.spawn(Duration::from_millis(config.gpio.simulate_interval_ms)),
                );
            }
            Box::new(simulation)
        }
    };
    attach_sensors(edge_source.as_mut(), sensors.clone(), clock.clone())?;

    let transport = Arc::new(ReqwestTransport::new(Duration::from_millis(
        config.master.request_timeout_ms,
    ))?);
    let reporter = Arc::new(Reporter::new(
        config.node.id,
        &config.master.base_url,
        transport,
    ));

    let link = Arc::new(NmcliLink::new(&config.network.interface));
    let time_sync = config.network.ntp_server.as_ref().map(|server| {
        Arc::new(SntpTimeSync::new(
            server.clone(),
            Duration::from_millis(config.network.ntp_timeout_ms),
            clock.clone(),
        )) as Arc<dyn TimeSync>
    });
    let supervisor = ConnectivitySupervisor::new(
        link,
        time_sync,
        clock.clone(),
        LinkCredentials {
            ssid: config.network.ssid.clone(),
            password: config.network.password.clone(),
        },
        config.network.connect_timeout_ms,
    );

    let node = RaceNode::new(
        clock,
        sensors,
        reporter,
        supervisor,
        config.heartbeat.interval_ms,
        Duration::from_millis(config.node.loop_sleep_ms),
    );

    info!("Race timer node is running");
    info!("  - Press Ctrl+C to exit");

    tokio::select! {
        _ = node.run() => {}
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received shutdown signal"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        },
    }

    if let Some(task) = simulation_task {
        task.abort();
    }
    drop(edge_source);

    info!("Race timer node stopped");
    Ok(())
}
