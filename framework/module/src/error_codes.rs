//! The supervisor's error-code table from the module user guide, mapped to
//! human-readable descriptions and recommended actions.

/// Description of a level-0 error code.
pub fn error_code_description(code: u16) -> String {
    let text = match code {
        0 => "UNPLUGGED - EV and EVSE not connected",
        1 => "STATUS_OK - Plugged in, no errors",
        139 => "SM_SAP_RESPONSE_FAILED",
        140 => "SM_SESSIONSETUP_RESPONSE_FAILED",
        141 => "SM_SERVICEDISCOVERY_RESPONSE_FAILED",
        142 => "SM_SERVICEPAYMENTSELECTION_RESPONSE_FAILED",
        143 => "SM_CONTRACT_AUTHENTICATION_RESPONSE_FAILED",
        144 => "SM_CHARGE_PARAMETER_DISCOVERY_RESPONSE_FAILED",
        145 => "SM_CABLE_CHECK_RESPONSE_FAILED",
        146 => "SM_PRE_CHARGE_RESPONSE_FAILED",
        147 => "SM_POWER_DELIVERY_PRECHARGE_RESPONSE_FAILED",
        148 => "SM_CURRENT_DEMAND_RESPONSE_FAILED",
        149 => "SM_POWER_DELIVERY_POSTCHARGE_RESPONSE_FAILED",
        150 => "SM_WELDING_DETECTION_RESPONSE_FAILED",
        151 => "SM_SESSION_STOP_RESPONSE_FAILED",
        152 => "SM_CHARGE_PARAMETER_EVSESTATUSCODE_FAILED",
        153 => "SM_CABLE_CHECK_EVSESTATUSCODE_FAILED",
        154 => "SM_PRE_CHARGE_EVSESTATUSCODE_FAILED",
        155 => "SM_PRECHARGE_EVSESTATUSCODE_FAILED",
        156 => "SM_CURRENT_DEMAND_EVSESTATUSCODE_FAILED",
        157 => "SM_POSTCHARGE_EVSESTATUSCODE_FAILED",
        158 => "SM_CABLE_CHECK_ISOLATION_NOTVALID",
        159 => "SM_SHUTDOWN_ERR",
        160 => "V2G_HLC_INIT_TIMEOUT - V2G Init took >20s",
        161 => "EVSE_EMERGENCY - EVSE emergency shutdown",
        162 => "LIMITS_MSG_TIMEOUT - CAN message timeout (1000ms)",
        163 => "STATUS_MSG_TIMEOUT - CAN message timeout (1000ms)",
        164 => "PLUGSTATUS_MSG_TIMEOUT - CAN message timeout (1000ms)",
        196 => "EV_SNA_ERROR - EVSE sent out-of-range value",
        215 => "SM_AUTHENTICATION_ONGOING_TIMEOUT - Auth >60s",
        216 => "SM_CPD_ONGOING_TIMEOUT - CPD >60s",
        217 => "SM_CABLECHECKTIMER_TIMEOUT - CableCheck >40s",
        218 => "SM_PRECHARGETIMER_TIMEOUT - PreCharge >7s",
        219 => "SM_READYTOCHARGE_TIMEOUT - Plugin to PowerDelivery >150s",
        235 => "SLAC_ATTENUATION_HIGH - Attenuation <10dB over threshold",
        236 => "SLAC_ATTENUATION_TOO_HIGH - Attenuation >10dB over threshold",
        237 => "LOW_VOLTAGE_DETECTED - Supply voltage below spec",
        240 => "EV_ERROR_CODE_SNA - Mandatory signal not set",
        241 => "EV_READY_SNA - Mandatory signal not set",
        242 => "EV_SOC_SNA - Mandatory signal not set",
        243 => "EV_TARGET_CUR_SNA - Mandatory signal not set",
        244 => "EV_TARGET_VOL_SNA - Mandatory signal not set",
        245 => "EV_CHARG_COMP_SNA - Mandatory signal not set",
        246 => "EV_MAX_VOLT_SNA - Mandatory signal not set",
        247 => "EV_MAX_CUR_SNA - Mandatory signal not set",
        248 => "EV_PRE_VOLT_SNA - Mandatory signal not set",
        249 => "EV_E_STOP_TRIGGERED - E-Stop triggered by EV",
        251 => "PARAMETERS_TIMEOUT - No valid params in 60s",
        _ => {
            return if (2..=138).contains(&code) {
                format!("Internal error (0x{code:02X}) - Contact chargebyte")
            } else if (167..=193).contains(&code) {
                format!("Range overflow error (0x{code:02X}) - Signal value out of range")
            } else {
                format!("Unknown error code: {code} (0x{code:04X})")
            }
        }
    };
    text.to_owned()
}

/// Recommended operator action for a level-0 error code.
pub fn error_code_action(code: u16) -> &'static str {
    match code {
        0 | 1 => "No action needed",
        139..=151 => "Communication failure - check EVSE compatibility and retry",
        152..=157 => "EVSE status error - check EVSE state",
        158 => "Isolation check failed - inspect HV cables",
        160 => "Timeout - ensure EVSE is responding; check PLC connection",
        161 => "EVSE emergency - check EVSE for faults; do not reconnect until safe",
        162..=164 => "CAN timeout - ensure all required CAN messages are sent at 100ms cycle",
        215..=219 => "Timeout - check communication and retry charging session",
        240..=248 => "Set all mandatory signals to valid values before charging",
        249 => "Emergency stop triggered - clear fault and restart",
        _ => "Check error details; unplug and retry; contact chargebyte if persistent",
    }
}
