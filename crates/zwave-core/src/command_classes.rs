//! The registry of Z-Wave command class identifiers.
//!
//! The numeric values are part of the Z-Wave specification, not an
//! implementation detail, so the full catalog is carried verbatim.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum CommandClasses {
    AlarmSensor = 0x9c,
    AlarmSilence = 0x9d,
    AllSwitch = 0x27,
    AntiTheft = 0x5d,
    AntiTheftUnlock = 0x7e,
    ApplicationCapability = 0x57,
    ApplicationStatus = 0x22,
    Association = 0x85,
    AssociationCommandConfiguration = 0x9b,
    AssociationGroupInformation = 0x59,
    Authentication = 0xa1,
    AuthenticationMediaWrite = 0xa2,
    BarrierOperator = 0x66,
    Basic = 0x20,
    BasicTariffInformation = 0x36,
    BasicWindowCovering = 0x50,
    Battery = 0x80,
    BinarySensor = 0x30,
    BinarySwitch = 0x25,
    BinaryToggleSwitch = 0x28,
    ClimateControlSchedule = 0x46,
    CentralScene = 0x5b,
    Clock = 0x81,
    ColorSwitch = 0x33,
    Configuration = 0x70,
    ControllerReplication = 0x21,
    CRC16Encapsulation = 0x56,
    DemandControlPlanConfiguration = 0x3a,
    DemandControlPlanMonitor = 0x3b,
    DeviceResetLocally = 0x5a,
    DoorLock = 0x62,
    DoorLockLogging = 0x4c,
    EnergyProduction = 0x90,
    EntryControl = 0x6f,
    FirmwareUpdateMetaData = 0x7a,
    GenericSchedule = 0xa3,
    GeographicLocation = 0x8c,
    GroupingName = 0x7b,
    Hail = 0x82,
    HRVStatus = 0x37,
    HRVControl = 0x39,
    HumidityControlMode = 0x6d,
    HumidityControlOperatingState = 0x6e,
    HumidityControlSetpoint = 0x64,
    InclusionController = 0x74,
    Indicator = 0x87,
    IPAssociation = 0x5c,
    IPConfiguration = 0x9a,
    IRRepeater = 0xa0,
    Irrigation = 0x6b,
    Language = 0x89,
    Lock = 0x76,
    Mailbox = 0x69,
    ManufacturerProprietary = 0x91,
    ManufacturerSpecific = 0x72,
    Meter = 0x32,
    MeterTableConfiguration = 0x3c,
    MeterTableMonitor = 0x3d,
    MeterTablePushConfiguration = 0x3e,
    MoveToPositionWindowCovering = 0x51,
    MultiChannel = 0x60,
    MultiChannelAssociation = 0x8e,
    MultiCommand = 0x8f,
    MultilevelSensor = 0x31,
    MultilevelSwitch = 0x26,
    MultilevelToggleSwitch = 0x29,
    NetworkManagementBasicNode = 0x4d,
    NetworkManagementInclusion = 0x34,
    NetworkManagementInstallationAndMaintenance = 0x67,
    NetworkManagementPrimary = 0x54,
    NetworkManagementProxy = 0x52,
    NoOperation = 0x00,
    NodeNamingAndLocation = 0x77,
    NodeProvisioning = 0x78,
    Notification = 0x71,
    Powerlevel = 0x73,
    Prepayment = 0x3f,
    PrepaymentEncapsulation = 0x41,
    Proprietary = 0x88,
    Protection = 0x75,
    PulseMeter = 0x35,
    RateTableConfiguration = 0x48,
    RateTableMonitor = 0x49,
    RemoteAssociationActivation = 0x7c,
    RemoteAssociationConfiguration = 0x7d,
    SceneActivation = 0x2b,
    SceneActuatorConfiguration = 0x2c,
    SceneControllerConfiguration = 0x2d,
    Schedule = 0x53,
    ScheduleEntryLock = 0x4e,
    ScreenAttributes = 0x93,
    ScreenMetaData = 0x92,
    Security = 0x98,
    Security2 = 0x9f,
    SensorConfiguration = 0x9e,
    SimpleAVControl = 0x94,
    SoundSwitch = 0x79,
    Supervision = 0x6c,
    TariffTableConfiguration = 0x4a,
    TariffTableMonitor = 0x4b,
    ThermostatFanMode = 0x44,
    ThermostatFanState = 0x45,
    ThermostatMode = 0x40,
    ThermostatOperatingState = 0x42,
    ThermostatSetback = 0x47,
    ThermostatSetpoint = 0x43,
    Time = 0x8a,
    TimeParameters = 0x8b,
    TransportService = 0x55,
    UserCode = 0x63,
    Version = 0x86,
    WakeUp = 0x84,
    WindowCovering = 0x6a,
    ZWavePlusInfo = 0x5e,
    /// Internal CC, not used directly by applications.
    ZWaveProtocol = 0x01,
}

impl CommandClasses {
    const ALL: &'static [CommandClasses] = &[
        Self::AlarmSensor,
        Self::AlarmSilence,
        Self::AllSwitch,
        Self::AntiTheft,
        Self::AntiTheftUnlock,
        Self::ApplicationCapability,
        Self::ApplicationStatus,
        Self::Association,
        Self::AssociationCommandConfiguration,
        Self::AssociationGroupInformation,
        Self::Authentication,
        Self::AuthenticationMediaWrite,
        Self::BarrierOperator,
        Self::Basic,
        Self::BasicTariffInformation,
        Self::BasicWindowCovering,
        Self::Battery,
        Self::BinarySensor,
        Self::BinarySwitch,
        Self::BinaryToggleSwitch,
        Self::ClimateControlSchedule,
        Self::CentralScene,
        Self::Clock,
        Self::ColorSwitch,
        Self::Configuration,
        Self::ControllerReplication,
        Self::CRC16Encapsulation,
        Self::DeviceResetLocally,
        Self::DoorLock,
        Self::DoorLockLogging,
        Self::EnergyProduction,
        Self::EntryControl,
        Self::FirmwareUpdateMetaData,
        Self::Indicator,
        Self::ManufacturerSpecific,
        Self::Meter,
        Self::MultiChannel,
        Self::MultiChannelAssociation,
        Self::MultiCommand,
        Self::MultilevelSensor,
        Self::MultilevelSwitch,
        Self::MultilevelToggleSwitch,
        Self::NoOperation,
        Self::Notification,
        Self::Powerlevel,
        Self::Protection,
        Self::SceneActivation,
        Self::Security,
        Self::Security2,
        Self::Supervision,
        Self::ThermostatFanMode,
        Self::ThermostatMode,
        Self::ThermostatSetpoint,
        Self::Time,
        Self::UserCode,
        Self::Version,
        Self::WakeUp,
        Self::ZWavePlusInfo,
        Self::ZWaveProtocol,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|cc| *cc as u16 == value as u16)
    }

    pub fn all_ccs() -> impl Iterator<Item = Self> {
        Self::ALL.iter().copied()
    }
}

impl Display for CommandClasses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} (0x{:02x})", self, *self as u16)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_u8_roundtrip() {
        assert_eq!(CommandClasses::from_u8(0x20), Some(CommandClasses::Basic));
        assert_eq!(CommandClasses::from_u8(0x98), Some(CommandClasses::Security));
        assert_eq!(CommandClasses::from_u8(0xfe), None);
    }
}
