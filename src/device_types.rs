//! Static device-type knowledge: names and per-channel channel types.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Device types occurring in datapoint lists.
///
/// Variants are named after the vendor model codes; [`info`] carries the
/// readable names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DeviceType {
	/// Single pushbutton (CTAA-01/xx).
	Ctaa01 = 1,
	/// Double pushbutton (CTAA-02/xx).
	Ctaa02 = 2,
	/// Quad pushbutton (CTAA-04/xx).
	Ctaa04 = 3,
	/// Room controller with switch (CRCA-00/01..04).
	Crca000x = 5,
	/// Switching actuator (CSAx-01/xx).
	Csax01 = 16,
	/// Dimming actuator (CDAx-01/xx).
	Cdax01 = 17,
	/// Shutter actuator (CJAU-01/01).
	Cjau0101 = 18,
	/// Binary input, 230V (CBEU-02/01).
	Cbeu0201 = 19,
	/// Binary input, battery (CBEU-02/02).
	Cbeu0202 = 20,
	/// Remote control, 12 channel, old design (CHSZ-12/01).
	Chsz1201 = 21,
	/// Home manager (CHMU-00/xx).
	Chmu00 = 22,
	/// Temperature input (CTEU-02/xx).
	Cteu02 = 23,
	/// Analog input (CAEE-02/xx).
	Caee02 = 24,
	/// Analog actuator (CAAE-01/xx).
	Caae01 = 25,
	/// Room manager (CRMA-00/xx).
	Crma00 = 26,
	/// Shutter actuator with security (CJAU-01/02).
	Cjau0102 = 27,
	/// Communication interface (CKOZ-00/03).
	Ckoz00 = 28,
	/// Motion detector (CBMA-02/xx).
	Cbma02 = 29,
	/// Remote control, 2 channel small (CHSZ-02/02).
	Chsz02 = 48,
	/// Remote control, 12 channel (CHSZ-12/03).
	Chsz1203 = 49,
	/// Remote control, 12 channel with display (CHSZ-12/04).
	Chsz1204 = 50,
	/// Room controller with switch/humidity (CRCA-00/05).
	Crca00 = 51,
	/// Router (no communication possible) (CROU-00/01).
	Crou00 = 52,
	/// Impulse input (CIZE-02/01).
	Cize02 = 53,
	/// EMS energy measurement (CEMx-01/01).
	Cemx01 = 54,
	/// E-radiator actuator (CHAZ-01/xx).
	Chaz01 = 55,
	/// Remote control alarm pushbutton (CHSZ-01/05).
	Chsz01 = 56,
	/// BOSCOS bed/chair occupancy sensor (CKOZ-02/08).
	Ckoz0208 = 57,
	/// MEP (CKOZ-00/09).
	Ckoz0009 = 62,
	/// Heat recovery ventilation (CHVZ-01/03).
	Chvz01 = 65,
	/// Room manager, new firmware (CRMA-00/xx).
	Crma00Fw = 67,
	/// Rosetta sensor.
	RosettaSensor = 68,
	/// Multi channel heating actuator (CHAZ-01/12).
	Chaz0112 = 71,
	/// Switching actuator, new generation (CSAU-01/01-1xxx).
	Csau0101 = 74,
	/// Router, new generation (CROU-01/01-Sx).
	Crou0101 = 75,
	/// Door/window sensor (CDWA-01/3x).
	Cdwa013x = 76,
	/// Dimming actuator, new generation (CDAx-01/xx).
	Cdax01Ng = 77,
	/// Room controller touch (CRCA-00/xx).
	Crca00xx = 78,
	/// Heating actuator (CHAx-01/xx).
	Chax010x = 81,
	/// Shutter actuator (CJAU-01/04).
	Cjau0104 = 86,
}

/// What a single channel of a device reports or accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
	Unknown,
	StatusBool,
	StatusPercent,
	StatusShutter,
	Pushbutton,
	Switch,
	OnOff,
	TemperatureSwitch,
	TemperatureWheelSwitch,
	ValueSwitch,
	HumiditySwitch,
	Motion,
	Energy,
	Power,
	Current,
	Voltage,
	Pulses,
	Dimplex,
}

use ChannelType::*;

const PUSHBUTTON_X2: &[ChannelType] = &[Pushbutton, Pushbutton];
const PUSHBUTTON_X16: &[ChannelType] = &[Pushbutton; 16];

/// Readable name and channel-type table for `device_type`.
pub fn info(device_type: DeviceType) -> (&'static str, &'static [ChannelType]) {
	match device_type {
		DeviceType::Ctaa01 => ("Single pushbutton (CTAA-01/xx)", &[Pushbutton]),
		DeviceType::Ctaa02 => ("Double pushbutton (CTAA-02/xx)", PUSHBUTTON_X2),
		DeviceType::Ctaa04 => (
			"Quad pushbutton (CTAA-04/xx)",
			&[Pushbutton, Pushbutton, Pushbutton, Pushbutton],
		),
		DeviceType::Crca000x => (
			"Room Controller (with Switch) (CRCA-00/01..04)",
			&[TemperatureWheelSwitch],
		),
		DeviceType::Csax01 => ("Switching Actuator (CSAx-01/xx)", &[StatusBool]),
		DeviceType::Cdax01 => ("Dimming Actuator (CDAx-01/xx)", &[StatusPercent]),
		DeviceType::Cjau0101 => ("Shutter Actuator (CJAU-01/01)", &[StatusShutter]),
		DeviceType::Cbeu0201 => ("Binary Input, 230V (CBEU-02/01)", &[Switch, Switch]),
		DeviceType::Cbeu0202 => ("Binary Input, Battery (CBEU-02/02)", &[Switch, Switch]),
		DeviceType::Chsz1201 => (
			"Remote Control 12 channel (old design) (CHSZ-12/01)",
			PUSHBUTTON_X16,
		),
		DeviceType::Chmu00 => ("Home-Manager (CHMU-00/xx)", &[]),
		DeviceType::Cteu02 => (
			"Temperature Input (CTEU-02/xx)",
			&[TemperatureSwitch, TemperatureSwitch],
		),
		DeviceType::Caee02 => ("Analog Input (CAEE-02/xx)", &[ValueSwitch, ValueSwitch]),
		DeviceType::Caae01 => ("Analog Actuator (CAAE-01/xx)", &[StatusPercent]),
		DeviceType::Crma00 => ("Room-Manager (CRMA-00/xx)", &[]),
		DeviceType::Cjau0102 => (
			"Shutter Actuator with Security (CJAU-01/02)",
			&[StatusShutter],
		),
		DeviceType::Ckoz00 => ("Communication Interface (CKOZ-00/03)", &[]),
		DeviceType::Cbma02 => ("Motion Detector (CBMA-02/xx)", &[Motion, Motion]),
		DeviceType::Chsz02 => (
			"Remote Control 2 channel small (CHSZ-02/02)",
			PUSHBUTTON_X2,
		),
		DeviceType::Chsz1203 => ("Remote Control 12 channel (CHSZ-12/03)", PUSHBUTTON_X16),
		DeviceType::Chsz1204 => (
			"Remote Control 12 channel with display (CHSZ-12/04)",
			PUSHBUTTON_X16,
		),
		DeviceType::Crca00 => (
			"Room Controller with Switch/Humidity (CRCA-00/05)",
			&[TemperatureWheelSwitch, HumiditySwitch],
		),
		DeviceType::Crou00 => (
			"Router (no communication possible, just ignore it) (CROU-00/01)",
			&[],
		),
		DeviceType::Cize02 => ("Impulse Input (CIZE-02/01)", &[Pulses, Pulses]),
		DeviceType::Cemx01 => ("EMS (CEMx-01/01)", &[Energy, Power, Current, Voltage]),
		DeviceType::Chaz01 => (
			"E-Radiator Actuator (CHAZ-01/xx)",
			&[Dimplex, Switch, Switch],
		),
		DeviceType::Chsz01 => ("Remote Control Alarm Pushbutton (CHSZ-01/05)", &[Pushbutton]),
		DeviceType::Ckoz0208 => (
			"BOSCOS (Bed/Chair Occupancy Sensor) (CKOZ-02/08)",
			&[Switch],
		),
		DeviceType::Ckoz0009 => ("MEP (CKOZ-00/09)", &[]),
		DeviceType::Chvz01 => ("HRV (CHVZ-01/03)", &[]),
		DeviceType::Crma00Fw => ("Room-Manager (new firmware) (CRMA-00/xx)", &[]),
		DeviceType::RosettaSensor => ("Rosetta sensor", PUSHBUTTON_X2),
		DeviceType::Chaz0112 => (
			"Multi Channel Heating Actuator (CHAZ-01/12)",
			&[
				OnOff, OnOff, Dimplex, Dimplex, Dimplex, Dimplex, Dimplex, Dimplex, Dimplex,
				Dimplex, Dimplex, Dimplex, Dimplex, Dimplex,
			],
		),
		DeviceType::Csau0101 => (
			"Switching Actuator New Generation (CSAU-01/01-1xxx)",
			&[StatusBool, Switch, Energy, Power, OnOff],
		),
		DeviceType::Crou0101 => (
			"Router New Generation (CROU-01/01-Sx)",
			&[Unknown, OnOff, OnOff, OnOff, OnOff],
		),
		DeviceType::Cdwa013x => ("Door/window sensor (CDWA-01/3x)", &[Switch]),
		DeviceType::Cdax01Ng => (
			"Dimming Actuator New Generation (CDAx-01/xx)",
			&[StatusPercent, Switch, Switch, Energy, Power, OnOff],
		),
		DeviceType::Crca00xx => (
			"Room Controller Touch (CRCA-00/xx)",
			&[
				TemperatureWheelSwitch,
				HumiditySwitch,
				Unknown,
				Unknown,
				Pushbutton,
				Pushbutton,
				TemperatureSwitch,
				Switch,
			],
		),
		DeviceType::Chax010x => (
			"Heating actuator (CHAx-01/xx)",
			&[Dimplex, Unknown, Energy, OnOff],
		),
		DeviceType::Cjau0104 => ("Shutter Actuator (CJAU-01/04)", &[StatusShutter]),
	}
}

impl DeviceType {
	pub fn name(self) -> &'static str {
		info(self).0
	}

	pub fn channels(self) -> &'static [ChannelType] {
		info(self).1
	}

	pub fn is_switching_actuator(self) -> bool {
		matches!(self, DeviceType::Csax01 | DeviceType::Csau0101)
	}

	pub fn is_dimming_actuator(self) -> bool {
		matches!(self, DeviceType::Cdax01 | DeviceType::Cdax01Ng)
	}

	pub fn is_shutter(self) -> bool {
		matches!(
			self,
			DeviceType::Cjau0101 | DeviceType::Cjau0102 | DeviceType::Cjau0104
		)
	}

	pub fn is_heating_actuator(self) -> bool {
		matches!(
			self,
			DeviceType::Chaz01 | DeviceType::Chaz0112 | DeviceType::Chax010x
		)
	}

	pub fn is_hrv(self) -> bool {
		matches!(self, DeviceType::Chvz01)
	}
}
