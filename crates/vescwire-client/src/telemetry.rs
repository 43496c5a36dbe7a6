//! Telemetry snapshot and the selective-field wire table.
//!
//! Responses carry no field tags: a field is present when its mask bit is
//! set, and present fields follow each other in [`TELEMETRY_FIELDS`] order.
//! The table must track the controller firmware exactly.

use num_enum::{FromPrimitive, IntoPrimitive};
use serde::Serialize;
use vescwire_frame::{PayloadBuilder, PayloadCursor, Result};

/// Field-presence bits of a selective telemetry response.
pub mod mask {
    pub const TEMP_MOSFET: u32 = 1 << 0;
    pub const TEMP_MOTOR: u32 = 1 << 1;
    pub const AVG_MOTOR_CURRENT: u32 = 1 << 2;
    pub const AVG_INPUT_CURRENT: u32 = 1 << 3;
    pub const AVG_ID: u32 = 1 << 4;
    pub const AVG_IQ: u32 = 1 << 5;
    pub const DUTY: u32 = 1 << 6;
    pub const RPM: u32 = 1 << 7;
    pub const INP_VOLTAGE: u32 = 1 << 8;
    pub const AMP_HOURS: u32 = 1 << 9;
    pub const AMP_HOURS_CHARGED: u32 = 1 << 10;
    pub const WATT_HOURS: u32 = 1 << 11;
    pub const WATT_HOURS_CHARGED: u32 = 1 << 12;
    pub const TACHOMETER: u32 = 1 << 13;
    pub const TACHOMETER_ABS: u32 = 1 << 14;
    pub const FAULT: u32 = 1 << 15;
    pub const PID_POS: u32 = 1 << 16;
    pub const CONTROLLER_ID: u32 = 1 << 17;

    /// Every field; selects the non-selective `GetValues` query.
    pub const ALL: u32 = u32::MAX;
}

/// Snapshot field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TempMosfet,
    TempMotor,
    AvgMotorCurrent,
    AvgInputCurrent,
    AvgId,
    AvgIq,
    DutyCycle,
    Rpm,
    InputVoltage,
    AmpHours,
    AmpHoursCharged,
    WattHours,
    WattHoursCharged,
    Tachometer,
    TachometerAbs,
    FaultCode,
    PidPos,
    ControllerId,
}

/// Wire representation of one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    /// i16, value = raw / scale.
    Float16 { scale: f32 },
    /// i32, value = raw / scale.
    Float32 { scale: f32 },
    /// i32, unscaled.
    Int32,
    /// u8, unscaled.
    Byte,
}

impl Encoding {
    pub const fn width(self) -> usize {
        match self {
            Encoding::Float16 { .. } => 2,
            Encoding::Float32 { .. } | Encoding::Int32 => 4,
            Encoding::Byte => 1,
        }
    }
}

/// One row of the telemetry table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub bit: u32,
    pub field: Field,
    pub encoding: Encoding,
}

impl FieldSpec {
    const fn new(bit: u32, field: Field, encoding: Encoding) -> Self {
        Self {
            bit,
            field,
            encoding,
        }
    }

    pub const fn mask(&self) -> u32 {
        1 << self.bit
    }
}

/// Telemetry fields in wire order. Bits above the last entry are reserved.
pub const TELEMETRY_FIELDS: [FieldSpec; 18] = [
    FieldSpec::new(0, Field::TempMosfet, Encoding::Float16 { scale: 10.0 }),
    FieldSpec::new(1, Field::TempMotor, Encoding::Float16 { scale: 10.0 }),
    FieldSpec::new(2, Field::AvgMotorCurrent, Encoding::Float32 { scale: 100.0 }),
    FieldSpec::new(3, Field::AvgInputCurrent, Encoding::Float32 { scale: 100.0 }),
    FieldSpec::new(4, Field::AvgId, Encoding::Float32 { scale: 100.0 }),
    FieldSpec::new(5, Field::AvgIq, Encoding::Float32 { scale: 100.0 }),
    FieldSpec::new(6, Field::DutyCycle, Encoding::Float16 { scale: 1000.0 }),
    FieldSpec::new(7, Field::Rpm, Encoding::Float32 { scale: 1.0 }),
    FieldSpec::new(8, Field::InputVoltage, Encoding::Float16 { scale: 10.0 }),
    FieldSpec::new(9, Field::AmpHours, Encoding::Float32 { scale: 10000.0 }),
    FieldSpec::new(10, Field::AmpHoursCharged, Encoding::Float32 { scale: 10000.0 }),
    FieldSpec::new(11, Field::WattHours, Encoding::Float32 { scale: 10000.0 }),
    FieldSpec::new(12, Field::WattHoursCharged, Encoding::Float32 { scale: 10000.0 }),
    FieldSpec::new(13, Field::Tachometer, Encoding::Int32),
    FieldSpec::new(14, Field::TachometerAbs, Encoding::Int32),
    FieldSpec::new(15, Field::FaultCode, Encoding::Byte),
    FieldSpec::new(16, Field::PidPos, Encoding::Float32 { scale: 1000000.0 }),
    FieldSpec::new(17, Field::ControllerId, Encoding::Byte),
];

/// Bytes a response body occupies for `mask` (after id and mask).
pub fn encoded_len(mask: u32) -> usize {
    TELEMETRY_FIELDS
        .iter()
        .filter(|spec| mask & spec.mask() != 0)
        .map(|spec| spec.encoding.width())
        .sum()
}

/// Controller fault codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FaultCode {
    None = 0,
    OverVoltage = 1,
    UnderVoltage = 2,
    Drv = 3,
    AbsOverCurrent = 4,
    OverTempFet = 5,
    OverTempMotor = 6,
    GateDriverOverVoltage = 7,
    GateDriverUnderVoltage = 8,
    McuUnderVoltage = 9,
    BootingFromWatchdogReset = 10,
    EncoderSpi = 11,
    EncoderSincosBelowMinAmplitude = 12,
    EncoderSincosAboveMaxAmplitude = 13,
    FlashCorruption = 14,
    HighOffsetCurrentSensor1 = 15,
    HighOffsetCurrentSensor2 = 16,
    HighOffsetCurrentSensor3 = 17,
    UnbalancedCurrents = 18,
    Brk = 19,
    ResolverLot = 20,
    ResolverDot = 21,
    ResolverLos = 22,
    FlashCorruptionAppCfg = 23,
    FlashCorruptionMcCfg = 24,
    EncoderNoMagnet = 25,
    /// A code newer than this table.
    #[num_enum(catch_all)]
    Other(u8),
}

// num_enum rejects `#[default]` alongside `catch_all`.
impl Default for FaultCode {
    fn default() -> Self {
        FaultCode::None
    }
}

/// Latest known controller measurements.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TelemetrySnapshot {
    /// °C
    pub temp_mosfet: f32,
    /// °C
    pub temp_motor: f32,
    /// A
    pub avg_motor_current: f32,
    /// A
    pub avg_input_current: f32,
    /// A, d-axis
    pub avg_id: f32,
    /// A, q-axis
    pub avg_iq: f32,
    /// Fraction, -1.0..=1.0
    pub duty_cycle: f32,
    /// Electrical RPM
    pub rpm: f32,
    /// V
    pub input_voltage: f32,
    pub amp_hours: f32,
    pub amp_hours_charged: f32,
    pub watt_hours: f32,
    pub watt_hours_charged: f32,
    pub tachometer: i32,
    pub tachometer_abs: i32,
    /// Raw fault byte; see [`TelemetrySnapshot::fault`].
    pub fault_code: u8,
    /// Degrees
    pub pid_pos: f32,
    pub controller_id: u8,
}

impl TelemetrySnapshot {
    pub fn fault(&self) -> FaultCode {
        FaultCode::from(self.fault_code)
    }

    /// Overwrite the fields selected by `mask` from `cursor`, in table order.
    ///
    /// Fields whose bit is clear keep their value and consume no bytes. On
    /// error `self` may be partially updated; callers decode into a copy.
    pub fn read_fields(&mut self, mask: u32, cursor: &mut PayloadCursor<'_>) -> Result<()> {
        for spec in TELEMETRY_FIELDS.iter().filter(|spec| mask & spec.mask() != 0) {
            let value = match spec.encoding {
                Encoding::Float16 { scale } => Value::Float(cursor.get_float16(scale)?),
                Encoding::Float32 { scale } => Value::Float(cursor.get_float32(scale)?),
                Encoding::Int32 => Value::Int(cursor.get_i32()?),
                Encoding::Byte => Value::Int(i32::from(cursor.get_u8()?)),
            };
            self.set(spec.field, value);
        }
        Ok(())
    }

    /// Controller-side counterpart of [`read_fields`](Self::read_fields), for
    /// simulators and test fixtures.
    pub fn write_fields(&self, mask: u32, out: &mut PayloadBuilder) -> Result<()> {
        for spec in TELEMETRY_FIELDS.iter().filter(|spec| mask & spec.mask() != 0) {
            let value = self.get(spec.field);
            match spec.encoding {
                Encoding::Float16 { scale } => out.append_i16((value.as_f32() * scale) as i16)?,
                Encoding::Float32 { scale } => out.append_i32((value.as_f32() * scale) as i32)?,
                Encoding::Int32 => out.append_i32(value.as_i32())?,
                Encoding::Byte => out.append_u8(value.as_i32() as u8)?,
            }
        }
        Ok(())
    }

    fn set(&mut self, field: Field, value: Value) {
        let f = value.as_f32();
        match field {
            Field::TempMosfet => self.temp_mosfet = f,
            Field::TempMotor => self.temp_motor = f,
            Field::AvgMotorCurrent => self.avg_motor_current = f,
            Field::AvgInputCurrent => self.avg_input_current = f,
            Field::AvgId => self.avg_id = f,
            Field::AvgIq => self.avg_iq = f,
            Field::DutyCycle => self.duty_cycle = f,
            Field::Rpm => self.rpm = f,
            Field::InputVoltage => self.input_voltage = f,
            Field::AmpHours => self.amp_hours = f,
            Field::AmpHoursCharged => self.amp_hours_charged = f,
            Field::WattHours => self.watt_hours = f,
            Field::WattHoursCharged => self.watt_hours_charged = f,
            Field::Tachometer => self.tachometer = value.as_i32(),
            Field::TachometerAbs => self.tachometer_abs = value.as_i32(),
            Field::FaultCode => self.fault_code = value.as_i32() as u8,
            Field::PidPos => self.pid_pos = f,
            Field::ControllerId => self.controller_id = value.as_i32() as u8,
        }
    }

    fn get(&self, field: Field) -> Value {
        match field {
            Field::TempMosfet => Value::Float(self.temp_mosfet),
            Field::TempMotor => Value::Float(self.temp_motor),
            Field::AvgMotorCurrent => Value::Float(self.avg_motor_current),
            Field::AvgInputCurrent => Value::Float(self.avg_input_current),
            Field::AvgId => Value::Float(self.avg_id),
            Field::AvgIq => Value::Float(self.avg_iq),
            Field::DutyCycle => Value::Float(self.duty_cycle),
            Field::Rpm => Value::Float(self.rpm),
            Field::InputVoltage => Value::Float(self.input_voltage),
            Field::AmpHours => Value::Float(self.amp_hours),
            Field::AmpHoursCharged => Value::Float(self.amp_hours_charged),
            Field::WattHours => Value::Float(self.watt_hours),
            Field::WattHoursCharged => Value::Float(self.watt_hours_charged),
            Field::Tachometer => Value::Int(self.tachometer),
            Field::TachometerAbs => Value::Int(self.tachometer_abs),
            Field::FaultCode => Value::Int(i32::from(self.fault_code)),
            Field::PidPos => Value::Float(self.pid_pos),
            Field::ControllerId => Value::Int(i32::from(self.controller_id)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Value {
    Float(f32),
    Int(i32),
}

impl Value {
    fn as_f32(self) -> f32 {
        match self {
            Value::Float(f) => f,
            Value::Int(i) => i as f32,
        }
    }

    fn as_i32(self) -> i32 {
        match self {
            Value::Float(f) => f as i32,
            Value::Int(i) => i,
        }
    }
}

/// The latest snapshot and the one it replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryHistory {
    latest: TelemetrySnapshot,
    previous: TelemetrySnapshot,
}

impl TelemetryHistory {
    pub fn latest(&self) -> &TelemetrySnapshot {
        &self.latest
    }

    pub fn previous(&self) -> &TelemetrySnapshot {
        &self.previous
    }

    /// Decode `mask` fields on top of the latest snapshot.
    ///
    /// All or nothing: on success the latest snapshot moves to `previous`; on
    /// error neither snapshot changes.
    pub fn apply(
        &mut self,
        mask: u32,
        cursor: &mut PayloadCursor<'_>,
    ) -> Result<&TelemetrySnapshot> {
        let mut next = self.latest;
        next.read_fields(mask, cursor)?;
        self.previous = std::mem::replace(&mut self.latest, next);
        Ok(&self.latest)
    }
}

#[cfg(test)]
mod tests {
    use vescwire_frame::FrameError;

    use super::*;

    #[test]
    fn table_bits_are_sequential() {
        for (i, spec) in TELEMETRY_FIELDS.iter().enumerate() {
            assert_eq!(spec.bit as usize, i, "{:?}", spec.field);
        }
        assert_eq!(TELEMETRY_FIELDS[7].mask(), mask::RPM);
        assert_eq!(TELEMETRY_FIELDS[15].mask(), mask::FAULT);
        assert_eq!(TELEMETRY_FIELDS[17].mask(), mask::CONTROLLER_ID);
    }

    #[test]
    fn full_response_length() {
        // 5 x i16, 12 x i32, 2 x u8
        assert_eq!(encoded_len(mask::ALL), 4 * 2 + 12 * 4 + 2);
        assert_eq!(encoded_len(mask::RPM | mask::FAULT), 5);
        assert_eq!(encoded_len(0), 0);
    }

    #[test]
    fn rpm_only_updates_rpm() {
        let mut snapshot = TelemetrySnapshot {
            temp_mosfet: 31.5,
            input_voltage: 48.2,
            tachometer: -7,
            ..TelemetrySnapshot::default()
        };
        let before = snapshot;

        let bytes = 12_000i32.to_be_bytes();
        let mut cursor = PayloadCursor::new(&bytes);
        snapshot.read_fields(mask::RPM, &mut cursor).unwrap();

        assert_eq!(snapshot.rpm, 12_000.0);
        assert_eq!(
            TelemetrySnapshot {
                rpm: before.rpm,
                ..snapshot
            },
            before
        );
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn fields_follow_table_order_regardless_of_mask() {
        // temp_motor (i16 /10), duty (i16 /1000), tachometer_abs (i32), controller_id (u8)
        let bytes = [
            0x01, 0x2C, // 300 -> 30.0
            0x01, 0xF4, // 500 -> 0.5
            0x00, 0x01, 0x86, 0xA0, // 100000
            0x2A, // 42
        ];
        let mut snapshot = TelemetrySnapshot::default();
        let mut cursor = PayloadCursor::new(&bytes);
        snapshot
            .read_fields(
                mask::CONTROLLER_ID | mask::TEMP_MOTOR | mask::TACHOMETER_ABS | mask::DUTY,
                &mut cursor,
            )
            .unwrap();

        assert_eq!(snapshot.temp_motor, 30.0);
        assert_eq!(snapshot.duty_cycle, 0.5);
        assert_eq!(snapshot.tachometer_abs, 100_000);
        assert_eq!(snapshot.controller_id, 42);
        assert_eq!(snapshot.temp_mosfet, 0.0);
    }

    #[test]
    fn reserved_bits_consume_nothing() {
        let bytes = [0x00, 0x00, 0x01, 0x00, 0xEE, 0xEE];
        let mut snapshot = TelemetrySnapshot::default();
        let mut cursor = PayloadCursor::new(&bytes);
        snapshot
            .read_fields(mask::RPM | 0xFFFC_0000, &mut cursor)
            .unwrap();

        assert_eq!(snapshot.rpm, 256.0);
        assert_eq!(cursor.rest(), &[0xEE, 0xEE]);
    }

    #[test]
    fn fault_code_is_typed() {
        let snapshot = TelemetrySnapshot {
            fault_code: 5,
            ..TelemetrySnapshot::default()
        };
        assert_eq!(snapshot.fault(), FaultCode::OverTempFet);
        assert_eq!(FaultCode::from(200), FaultCode::Other(200));
        assert_eq!(u8::from(FaultCode::Drv), 3);
        assert_eq!(TelemetrySnapshot::default().fault(), FaultCode::None);
        assert_eq!(FaultCode::default(), FaultCode::None);
    }

    #[test]
    fn history_archives_on_success_only() {
        let mut history = TelemetryHistory::default();

        let first = 1_000i32.to_be_bytes();
        history
            .apply(mask::RPM, &mut PayloadCursor::new(&first))
            .unwrap();
        let second = 2_000i32.to_be_bytes();
        history
            .apply(mask::RPM, &mut PayloadCursor::new(&second))
            .unwrap();

        assert_eq!(history.latest().rpm, 2_000.0);
        assert_eq!(history.previous().rpm, 1_000.0);

        // RPM present but the voltage that follows it is cut short.
        let truncated = [0x00, 0x00, 0x0B, 0xB8, 0x01];
        let err = history
            .apply(mask::RPM | mask::INP_VOLTAGE, &mut PayloadCursor::new(&truncated))
            .unwrap_err();
        assert!(matches!(err, FrameError::Truncated { .. }));
        assert_eq!(history.latest().rpm, 2_000.0);
        assert_eq!(history.previous().rpm, 1_000.0);
    }

    #[test]
    fn simulator_output_reads_back() {
        let source = TelemetrySnapshot {
            temp_mosfet: 41.2,
            avg_motor_current: -3.25,
            rpm: 15_000.0,
            tachometer: -123_456,
            fault_code: 4,
            pid_pos: 123.456789,
            controller_id: 9,
            ..TelemetrySnapshot::default()
        };
        let fields = mask::TEMP_MOSFET
            | mask::AVG_MOTOR_CURRENT
            | mask::RPM
            | mask::TACHOMETER
            | mask::FAULT
            | mask::PID_POS
            | mask::CONTROLLER_ID;

        let mut out = PayloadBuilder::new();
        source.write_fields(fields, &mut out).unwrap();
        assert_eq!(out.len(), encoded_len(fields));

        let mut decoded = TelemetrySnapshot::default();
        decoded
            .read_fields(fields, &mut PayloadCursor::new(out.as_slice()))
            .unwrap();

        assert!((decoded.temp_mosfet - 41.2).abs() < 0.11);
        assert!((decoded.avg_motor_current + 3.25).abs() < 0.011);
        assert_eq!(decoded.rpm, 15_000.0);
        assert_eq!(decoded.tachometer, -123_456);
        assert_eq!(decoded.fault(), FaultCode::AbsOverCurrent);
        assert!((decoded.pid_pos - 123.456789).abs() < 1e-3);
        assert_eq!(decoded.controller_id, 9);
    }
}
