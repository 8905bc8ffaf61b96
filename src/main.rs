//! PIDRIMS simulator: runs the RIMS control loop against a simulated mash.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  SimulatedMash            LogEventSink   StdTimeAdapter  │
//! │  (Sensor+Actuator+Kettle) (EventSink)    (TimePort)      │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────┐      │
//! │  │         ControlLoop (pure logic)               │      │
//! │  │  PID · RIMS interlock · Hysteresis             │      │
//! │  └────────────────────────────────────────────────┘      │
//! │                                                          │
//! │  LocalExecutor: control task + stopper task              │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing_subscriber::filter::LevelFilter;

use pidrims::adapters::log_sink::LogEventSink;
use pidrims::adapters::sim::{PlantParams, SimWiring, SimulatedMash};
use pidrims::adapters::time::StdTimeAdapter;
use pidrims::app::control_loop::ControlLoop;
use pidrims::app::events::StopReason;
use pidrims::app::ports::TimePort;
use pidrims::app::stop::StopSignal;
use pidrims::config::{DeviceId, KettleSetup, RimsConfig, TempUnit, device_id};

#[derive(Parser, Debug)]
#[command(
    name = "pidrims",
    version,
    about = "Run the RIMS PID controller against a simulated mash"
)]
struct Args {
    /// JSON setup file (kettle wiring, property bag, target).
    #[arg(short, long)]
    setup: Option<PathBuf>,

    /// Simulated seconds to run before requesting a stop.
    #[arg(short, long, default_value_t = 600)]
    duration: u64,

    /// How many times faster than real time the simulation runs.
    #[arg(long, default_value_t = 60.0)]
    speedup: f64,

    /// Log PID terms and every power command.
    #[arg(short, long)]
    verbose: bool,
}

/// On-disk simulation setup.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct Setup {
    kettle: KettleSetup,
    /// Kettle properties (gains, delta, sample time, RIMS sensor).
    props: Map<String, Value>,
    /// Host-wide settings such as `TEMP_UNIT`.
    config: Map<String, Value>,
    target: f32,
    initial_temp: f32,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            kettle: KettleSetup {
                id: id_or_empty("mlt"),
                heater: Some(id_or_empty("rims-heater")),
                sensor: Some(id_or_empty("mlt-probe")),
            },
            props: Map::new(),
            config: Map::new(),
            target: 65.0,
            initial_temp: 55.0,
        }
    }
}

fn id_or_empty(s: &str) -> DeviceId {
    device_id(s).unwrap_or_default()
}

fn load_setup(path: Option<&PathBuf>) -> Result<Setup> {
    let Some(path) = path else {
        info!("No setup file given, using the built-in mash");
        return Ok(Setup::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading setup {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing setup {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        })
        .init();

    info!("PIDRIMS v{}", env!("CARGO_PKG_VERSION"));

    let setup = load_setup(args.setup.as_ref())?;
    let config = RimsConfig::from_props(
        &setup.props,
        TempUnit::from_host_config(&setup.config),
    );

    let wiring = SimWiring {
        kettle: setup.kettle.id.clone(),
        heater: setup.kettle.heater.clone().unwrap_or_default(),
        mlt_sensor: setup.kettle.sensor.clone().unwrap_or_default(),
        rims_sensor: config
            .rims_sensor
            .clone()
            .unwrap_or_else(|| id_or_empty("rims-probe")),
    };

    let time = StdTimeAdapter::with_speedup(args.speedup);
    let mut mash = SimulatedMash::new(
        wiring,
        PlantParams::default(),
        time,
        setup.initial_temp,
        setup.target,
    );
    let mut sink = LogEventSink::new();
    let stop = StopSignal::new();
    let mut ctrl = ControlLoop::new(config, setup.kettle);

    info!(
        "Simulating {}s at {}x: mash {:.1} -> target {:.1}",
        args.duration,
        time.speedup(),
        setup.initial_temp,
        setup.target
    );

    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    executor
        .spawn(async {
            time.sleep(Duration::from_secs(args.duration)).await;
            info!("Duration elapsed, requesting stop");
            stop.request_stop();
        })
        .detach();

    let report = futures_lite::future::block_on(
        executor.run(ctrl.run(&mut mash, &time, &mut sink, &stop)),
    );

    info!(
        "Finished after {:.0} simulated seconds: mash {:.2}, RIMS tube {:.2}",
        time.uptime_secs(),
        mash.mlt_temp(),
        mash.rims_temp()
    );

    match report.reason {
        StopReason::Requested | StopReason::Cancelled => Ok(()),
        StopReason::Faulted(e) => Err(anyhow::anyhow!("controller faulted: {e}")),
    }
}
