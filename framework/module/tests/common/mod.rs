//! Shared fixture: an in-memory bus description matching the layouts the
//! simulator transmits, plus frame-building helpers.

#![allow(dead_code)]

use ccs_core::CanFrame;
use ccs_dbc::{Database, DecodedSignal, Parser};

pub const CMS_DBC: &str = r#"VERSION ""

BU_: VCU CMS

BO_ 2147485184 ChargeInfo: 8 CMS
 SG_ ControlPilotDutyCycle : 0|7@1+ (1,0) [0|100] "%" VCU
 SG_ StateMachineState : 8|4@1+ (1,0) [0|15] "" VCU
 SG_ ControlPilotState : 12|4@1+ (1,0) [0|15] "" VCU
 SG_ ActualChargeProtocol : 16|4@1+ (1,0) [0|15] "" VCU
 SG_ ProximityPinState : 20|4@1+ (1,0) [0|15] "" VCU
 SG_ SwS2Close : 24|2@1+ (1,0) [0|3] "" VCU
 SG_ VoltageMatch : 26|2@1+ (1,0) [0|3] "" VCU
 SG_ EVSECompatible : 28|2@1+ (1,0) [0|3] "" VCU
 SG_ BCBStatus : 30|2@1+ (1,0) [0|3] "" VCU
 SG_ TCPStatus : 32|2@1+ (1,0) [0|3] "" VCU
 SG_ AliveCounter : 36|4@1+ (1,0) [0|15] "" VCU

BO_ 2147488512 EVDCMaxLimits: 8 VCU
 SG_ EVMaxCurrent : 0|16@1+ (0.1,0) [0|6500] "A" CMS
 SG_ EVMaxVoltage : 16|16@1+ (0.1,0) [0|6500] "V" CMS
 SG_ EVMaxPower : 32|16@1+ (100,0) [0|3276700] "W" CMS
 SG_ EVFullSoC : 48|8@1+ (1,0) [0|100] "%" CMS
 SG_ EVBulkSoC : 56|8@1+ (1,0) [0|100] "%" CMS

BO_ 2147488513 EVDCChargeTargets: 8 VCU
 SG_ EVTargetCurrent : 0|16@1+ (0.1,-3250) [-3250|3276.7] "A" CMS
 SG_ EVTargetVoltage : 16|16@1+ (0.1,0) [0|6500] "V" CMS
 SG_ EVPreChargeVoltage : 32|16@1+ (0.1,0) [0|6500] "V" CMS

BO_ 2147488514 EVStatusControl: 8 VCU
 SG_ ChargeProgressIndication : 0|2@1+ (1,0) [0|3] "" CMS
 SG_ ChargeStopIndication : 2|2@1+ (1,0) [0|3] "" CMS
 SG_ EVReady : 4|2@1+ (1,0) [0|3] "" CMS
 SG_ EVWeldingDetectionEnable : 6|2@1+ (1,0) [0|3] "" CMS
 SG_ ChargeProtocolPriority : 8|3@1+ (1,0) [0|7] "" CMS
 SG_ BCBControl : 12|2@1+ (1,0) [0|3] "" CMS

BO_ 2147488515 EVStatusDisplay: 8 VCU
 SG_ EVSoC : 0|8@1+ (1,0) [0|100] "%" CMS
 SG_ EVErrorCode : 8|8@1+ (1,0) [0|255] "" CMS
 SG_ EVChargingComplete : 16|2@1+ (1,0) [0|3] "" CMS
 SG_ EVBulkChargingComplete : 18|2@1+ (1,0) [0|3] "" CMS
 SG_ EVCabinConditioning : 20|2@1+ (1,0) [0|3] "" CMS
 SG_ EVRESSConditioning : 22|2@1+ (1,0) [0|3] "" CMS
 SG_ EVTimeToFullSoC : 24|16@1+ (1,0) [0|65535] "s" CMS
 SG_ EVTimeToBulkSoC : 40|16@1+ (1,0) [0|65535] "s" CMS

BO_ 2147488516 EVPlugStatus: 8 VCU
 SG_ EVControlPilotDutyCycle : 0|7@1+ (1,0) [0|100] "%" CMS
 SG_ EVControlPilotState : 8|4@1+ (1,0) [0|15] "" CMS
 SG_ EVProximityPinState : 12|4@1+ (1,0) [0|15] "" CMS

BO_ 2147488517 EVDCEnergyLimits: 8 VCU
 SG_ EVEnergyCapacity : 0|16@1+ (100,0) [0|3276700] "Wh" CMS
 SG_ EVEnergyRequest : 16|16@1+ (100,0) [0|3276700] "Wh" CMS

BO_ 2147488768 EVSEDCMaxLimits: 8 CMS
 SG_ EVSEMaxCurrent : 0|16@1+ (0.1,0) [0|6500] "A" VCU
 SG_ EVSEMaxVoltage : 16|16@1+ (0.1,0) [0|6500] "V" VCU
 SG_ EVSEMaxPower : 32|16@1+ (100,0) [0|3276700] "W" VCU
 SG_ EVSEEnergyToBeDelivered : 48|16@1+ (100,0) [0|3276700] "Wh" VCU

BO_ 2147488769 EVSEDCRegulationLimits: 8 CMS
 SG_ EVSEMinCurrent : 0|16@1+ (0.1,0) [0|6500] "A" VCU
 SG_ EVSEMinVoltage : 16|16@1+ (0.1,0) [0|6500] "V" VCU
 SG_ EVSEPeakCurrentRipple : 32|16@1+ (0.1,0) [0|6500] "A" VCU
 SG_ EVSECurrentRegulationTolerance : 48|16@1+ (0.1,0) [0|6500] "A" VCU

BO_ 2147488770 EVSEDCStatus: 8 CMS
 SG_ EVSEPresentCurrent : 0|16@1+ (0.1,-3250) [-3250|3276.7] "A" VCU
 SG_ EVSEPresentVoltage : 16|16@1+ (0.1,0) [0|6500] "V" VCU
 SG_ EVSEIsolationStatus : 32|3@1+ (1,0) [0|7] "" VCU
 SG_ EVSEVoltageLimitAchieved : 36|2@1+ (1,0) [0|3] "" VCU
 SG_ EVSENotification : 38|2@1+ (1,0) [0|3] "" VCU
 SG_ EVSEStatusCode : 40|4@1+ (1,0) [0|15] "" VCU
 SG_ EVSECurrentLimitAchieved : 44|2@1+ (1,0) [0|3] "" VCU
 SG_ EVSEPowerLimitAchieved : 46|2@1+ (1,0) [0|3] "" VCU
 SG_ EVSENotificationMaxDelay : 48|16@1+ (1,0) [0|65535] "ms" VCU

BO_ 2147491841 SoftwareInfo: 8 CMS
 SG_ SoftwareVersionMajor : 0|8@1+ (1,0) [0|255] "" VCU
 SG_ SoftwareVersionMinor : 8|8@1+ (1,0) [0|255] "" VCU
 SG_ SoftwareVersionPatch : 16|8@1+ (1,0) [0|255] "" VCU
 SG_ SoftwareVersionConfig : 24|8@1+ (1,0) [0|255] "" VCU

BO_ 2147491842 ErrorCodes: 8 CMS
 SG_ ErrorCodeLevel0 : 0|16@1+ (1,0) [0|65535] "" VCU
 SG_ ErrorCodeLevel1 : 16|16@1+ (1,0) [0|65535] "" VCU
 SG_ ErrorCodeLevel2 : 32|16@1+ (1,0) [0|65535] "" VCU
 SG_ ErrorCodeLevel3 : 48|16@1+ (1,0) [0|65535] "" VCU

BO_ 2147491843 SLACInfo: 8 CMS
 SG_ SLACState : 0|3@1+ (1,0) [0|7] "" VCU
 SG_ LinkStatus : 4|2@1+ (1,0) [0|3] "" VCU
 SG_ MeasuredAttenuation : 8|8@1+ (0.5,0) [0|100] "dB" VCU

BA_ "DBName" "ISC_CMS_Automotive";
BA_ "BusType" "CAN";
BA_ "GenMsgCycleTime" BO_ 2147488512 100;
BA_ "GenMsgCycleTime" BO_ 2147485184 100;
VAL_ 2147485184 StateMachineState 0 "Default" 1 "Init" 2 "Authentication" 3 "Parameter" 4 "Isolation" 5 "PreCharge" 6 "Charge" 7 "Welding" 8 "StopCharge" 9 "SessionStop" 10 "ShutOff" 11 "Paused" 12 "Error" 15 "SNA" ;
VAL_ 2147485184 ControlPilotState 0 "A" 1 "B" 2 "C" 15 "SNA" ;
VAL_ 2147485184 AliveCounter 15 "SNA" ;
VAL_ 2147488770 EVSEIsolationStatus 0 "Invalid" 1 "Valid" 7 "SNA" ;
VAL_ 2147488770 EVSEStatusCode 0 "NotReady" 1 "Ready" 5 "EmergencyShutdown" 6 "Malfunction" 15 "SNA" ;
VAL_ 2147488770 EVSENotificationMaxDelay 65535 "SNA" ;
VAL_ 2147491843 SLACState 7 "SNA" ;
VAL_ 2147491843 LinkStatus 3 "SNA" ;
"#;

pub fn database() -> Database {
    Parser::parse_str(CMS_DBC)
}

/// ChargeInfo frame with the given supervisor state and alive counter.
pub fn charge_info_frame(state: u8, alive: u8) -> CanFrame {
    let mut data = [0u8; 8];
    data[1] = state & 0x0F;
    data[4] = (alive & 0x0F) << 4;
    CanFrame::new_extended(0x0600, &data)
}

/// Decode one named signal out of a frame, via the fixture description.
pub fn decode_signal(db: &Database, frame: &CanFrame, name: &str) -> DecodedSignal {
    db.find_signal(frame.id, name)
        .unwrap_or_else(|| panic!("signal {name} not in fixture for 0x{:04X}", frame.id))
        .decode(&frame.data)
        .unwrap()
}
