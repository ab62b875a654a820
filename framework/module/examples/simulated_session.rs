//! Drive a complete simulated charge session and print what happens.
//!
//! ```sh
//! cargo run -p ccs-module --example simulated_session
//! ```

use std::time::Duration;

use ccs_can::{CanBackend, CanInterface, SimulatedCan};
use ccs_core::state::CmsState;
use ccs_module::{ChargeController, EngineConfig, EngineEvent};

const CMS_DBC: &str = include_str!("cms_sample.dbc");

fn main() {
    let controller = ChargeController::new(EngineConfig::default());
    controller.set_database(ccs_dbc::Parser::parse_str(CMS_DBC));
    let events = controller.subscribe();

    let mut sim = SimulatedCan::new();
    sim.open(0x0001, 500_000).expect("simulator always opens");
    controller.attach_transport(CanBackend::Simulated(sim));

    controller.set_ev_max_voltage(400.0);
    controller.set_ev_max_current(150.0);
    controller.set_ev_target_voltage(400.0);
    controller.set_ev_target_current(50.0);
    controller.set_ev_soc(40.0);

    controller.start();
    controller.request_start_charging();

    let deadline = std::time::Instant::now() + Duration::from_secs(3);
    while std::time::Instant::now() < deadline {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(EngineEvent::StateChanged(state)) => {
                println!("supervisor state -> {state}");
                if state == CmsState::Parameter {
                    println!("parameters accepted, supervisor is negotiating");
                }
            }
            Ok(EngineEvent::ErrorCodeReceived { code, description }) => {
                println!("error code {code}: {description}");
            }
            Ok(_) | Err(_) => {}
        }
    }

    let snapshot = controller.supervisor();
    println!(
        "EVSE limits: {:.1} V / {:.1} A / {:.0} W",
        snapshot.evse_max_voltage, snapshot.evse_max_current, snapshot.evse_max_power
    );
    println!(
        "present: {:.1} V / {:.1} A, state {}",
        snapshot.evse_present_voltage, snapshot.evse_present_current, snapshot.state
    );

    controller.stop();
}
