//! End-to-end tests driving the engine against a scripted stick on the far
//! end of an in-memory duplex stream.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use xcomfort::{Error, Event, Handler, Interface, ShutterStatus, SignalStrength, Value, mci};

#[derive(Debug, Clone, PartialEq)]
enum Call {
	StatusValue(u8, u8),
	StatusBool(u8, bool),
	StatusShutter(u8, ShutterStatus),
	Event(u8, String),
	ValueEvent(u8, String, f64),
	Value(u8, String),
	Wheel(u8, f64),
	Valve(u8, u8),
	Battery(u32, u8),
	Power(u32, f64),
	InternalTemperature(u32, i32),
	Rssi(u32, u8),
	DplChanged,
}

#[derive(Default)]
struct Recorder {
	calls: Mutex<Vec<Call>>,
}

impl Recorder {
	fn push(&self, call: Call) {
		self.calls.lock().unwrap().push(call);
	}

	fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap().clone()
	}

	async fn wait_for(&self, wanted: &Call) {
		timeout(Duration::from_secs(5), async {
			loop {
				if self.calls().contains(wanted) {
					return;
				}
				tokio::time::sleep(Duration::from_millis(5)).await;
			}
		})
		.await
		.expect("callback never arrived");
	}
}

impl Handler for Recorder {
	fn status_value(&self, dp: &xcomfort::Datapoint, value: u8) {
		self.push(Call::StatusValue(dp.number(), value));
	}
	fn status_bool(&self, dp: &xcomfort::Datapoint, on: bool) {
		self.push(Call::StatusBool(dp.number(), on));
	}
	fn status_shutter(&self, dp: &xcomfort::Datapoint, status: ShutterStatus) {
		self.push(Call::StatusShutter(dp.number(), status));
	}
	fn event(&self, dp: &xcomfort::Datapoint, event: Event) {
		self.push(Call::Event(dp.number(), event.to_string()));
	}
	fn value_event(&self, dp: &xcomfort::Datapoint, event: Event, value: f64) {
		self.push(Call::ValueEvent(dp.number(), event.to_string(), value));
	}
	fn value(&self, dp: &xcomfort::Datapoint, value: Value) {
		self.push(Call::Value(dp.number(), value.to_string()));
	}
	fn wheel(&self, dp: &xcomfort::Datapoint, value: f64) {
		self.push(Call::Wheel(dp.number(), value));
	}
	fn valve(&self, dp: &xcomfort::Datapoint, position: u8) {
		self.push(Call::Valve(dp.number(), position));
	}
	fn battery(&self, device: &xcomfort::Device, percentage: u8) {
		self.push(Call::Battery(device.serial_number(), percentage));
	}
	fn power(&self, device: &xcomfort::Device, watts: f64) {
		self.push(Call::Power(device.serial_number(), watts));
	}
	fn internal_temperature(&self, device: &xcomfort::Device, centigrade: i32) {
		self.push(Call::InternalTemperature(device.serial_number(), centigrade));
	}
	fn rssi(&self, device: &xcomfort::Device, rssi: SignalStrength) {
		self.push(Call::Rssi(device.serial_number(), rssi.0));
	}
	fn dpl_changed(&self) {
		self.push(Call::DplChanged);
	}
}

/// Reads one frame from the stick's side, returning the payload starting at
/// the packet-type byte.
async fn stick_read(stream: &mut DuplexStream) -> Vec<u8> {
	try_stick_read(stream).await.expect("stream closed")
}

async fn try_stick_read(stream: &mut DuplexStream) -> Option<Vec<u8>> {
	let mut header = [0u8; 2];
	stream.read_exact(&mut header).await.ok()?;
	assert_eq!(header[0], mci::SER_START);
	let mut frame = vec![0u8; usize::from(header[1])];
	stream.read_exact(&mut frame).await.ok()?;
	assert_eq!(frame.pop(), Some(mci::SER_STOP));
	Some(frame)
}

async fn stick_write(stream: &mut DuplexStream, payload: &[u8]) {
	let mut frame = vec![mci::SER_START, payload.len() as u8 + 1];
	frame.extend_from_slice(payload);
	frame.push(mci::SER_STOP);
	stream.write_all(&frame).await.unwrap();
}

/// Writes `records` as a tab-separated datapoint file and loads it.
async fn load_registry(iface: &Interface, records: &[(u8, &str, u32, u8, u8)]) {
	static COUNTER: AtomicU32 = AtomicU32::new(0);
	let mut contents = String::new();
	for (number, name, serial, device_type, channel) in records {
		contents.push_str(&format!(
			"{number}\t{name}\t{serial}\t{device_type}\t{channel}\t0\t0\t\t\n"
		));
	}
	let path = std::env::temp_dir().join(format!(
		"xcomfort-dpl-{}-{}.txt",
		std::process::id(),
		COUNTER.fetch_add(1, Ordering::Relaxed)
	));
	std::fs::write(&path, contents).unwrap();
	iface.read_file(&path).await.unwrap();
	let _ = std::fs::remove_file(&path);
}

struct Rig {
	iface: Interface,
	recorder: Arc<Recorder>,
	stick: DuplexStream,
	token: CancellationToken,
	engine: JoinHandle<xcomfort::Result<()>>,
}

impl Rig {
	async fn start(records: &[(u8, &str, u32, u8, u8)]) -> Self {
		let recorder = Arc::new(Recorder::default());
		let iface = Interface::new(recorder.clone(), false);
		load_registry(&iface, records).await;

		let (engine_side, stick) = tokio::io::duplex(1024);
		let token = CancellationToken::new();
		let engine = tokio::spawn({
			let iface = iface.clone();
			let token = token.clone();
			async move { iface.run(token, engine_side).await }
		});

		Rig {
			iface,
			recorder,
			stick,
			token,
			engine,
		}
	}

	async fn shutdown(self) {
		self.token.cancel();
		self.engine.await.unwrap().unwrap();
	}
}

fn tx_seq(frame: &[u8]) -> u8 {
	*frame.last().unwrap() >> 4
}

fn ok_mrf_reply(seq: u8, detail: u8) -> Vec<u8> {
	vec![
		mci::PT_STATUS,
		mci::STT_OK,
		mci::OK_MRF,
		seq << 4,
		detail,
	]
}

#[tokio::test]
async fn switch_on_round_trip() {
	let mut rig = Rig::start(&[(17, "lamp", 4711, 16, 0)]).await;
	let dp = rig.iface.datapoint(17).unwrap();

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.switch(&dp, true).await }
	});

	let frame = stick_read(&mut rig.stick).await;
	assert_eq!(frame[..4], [mci::PT_TX, 17, mci::TE_SWITCH, mci::TED_ON]);
	let seq = tx_seq(&frame);
	assert!(seq < 16);

	stick_write(&mut rig.stick, &ok_mrf_reply(seq, mci::OKMRF_ACK_DIRECT)).await;
	let response = caller.await.unwrap().unwrap();
	assert!(response.is_some());

	rig.shutdown().await;
}

#[tokio::test]
async fn dim_burst_collapses_to_latest() {
	let mut rig = Rig::start(&[(17, "dimmer", 4711, 17, 0)]).await;
	let dp = rig.iface.datapoint(17).unwrap();

	let dim = |value: u8| {
		let iface = rig.iface.clone();
		let dp = dp.clone();
		tokio::spawn(async move { iface.dim(&dp, value).await })
	};

	let first = dim(10);
	let first_frame = stick_read(&mut rig.stick).await;
	assert_eq!(
		first_frame[..5],
		[mci::PT_TX, 17, mci::TE_DIM, mci::TED_PERCENT, 10]
	);

	// While the first command is in flight, two more queue up behind the
	// datapoint's collapse queue.
	let second = dim(30);
	for _ in 0..20 {
		tokio::task::yield_now().await;
	}
	let third = dim(70);
	for _ in 0..20 {
		tokio::task::yield_now().await;
	}

	stick_write(&mut rig.stick, &ok_mrf_reply(tx_seq(&first_frame), mci::OKMRF_ACK_DIRECT))
		.await;

	let third_frame = stick_read(&mut rig.stick).await;
	assert_eq!(
		third_frame[..5],
		[mci::PT_TX, 17, mci::TE_DIM, mci::TED_PERCENT, 70]
	);
	stick_write(&mut rig.stick, &ok_mrf_reply(tx_seq(&third_frame), mci::OKMRF_ACK_DIRECT))
		.await;

	assert!(first.await.unwrap().unwrap().is_some());
	// The middle command was superseded before it reached the wire.
	assert!(second.await.unwrap().unwrap().is_none());
	assert!(third.await.unwrap().unwrap().is_some());

	// Nothing else was transmitted.
	rig.token.cancel();
	rig.engine.await.unwrap().unwrap();
	assert_eq!(timeout(Duration::from_secs(1), try_stick_read(&mut rig.stick))
		.await
		.unwrap(), None);
}

#[tokio::test]
async fn concurrent_tx_commands_are_matched_by_tag() {
	let rig = Rig::start(&[
		(1, "a", 101, 16, 0),
		(2, "b", 102, 16, 0),
		(3, "c", 103, 16, 0),
		(4, "d", 104, 16, 0),
	])
	.await;
	let mut stick = rig.stick;

	let mut callers = Vec::new();
	for number in 1..=4u8 {
		let iface = rig.iface.clone();
		let dp = rig.iface.datapoint(number).unwrap();
		callers.push(tokio::spawn(async move { iface.switch(&dp, true).await }));
	}

	let mut frames = Vec::new();
	for _ in 0..4 {
		frames.push(stick_read(&mut stick).await);
	}

	let mut seen = Vec::new();
	for frame in &frames {
		let seq = tx_seq(frame);
		assert!(!seen.contains(&seq), "duplicate sequence tag {seq}");
		seen.push(seq);
	}

	// Answer in reverse order, marking each reply with the datapoint it
	// belongs to.
	for frame in frames.iter().rev() {
		let mut reply = ok_mrf_reply(tx_seq(frame), mci::OKMRF_ACK_ROUTED);
		reply.push(frame[1]);
		stick_write(&mut stick, &reply).await;
	}

	for (caller, number) in callers.into_iter().zip(1..=4u8) {
		let response = caller.await.unwrap().unwrap().unwrap();
		assert_eq!(*response.last().unwrap(), number);
	}

	rig.token.cancel();
	rig.engine.await.unwrap().unwrap();
}

#[tokio::test]
async fn retryable_errors_are_retried() {
	let mut rig = Rig::start(&[(17, "lamp", 4711, 16, 0)]).await;
	let dp = rig.iface.datapoint(17).unwrap();

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.switch(&dp, false).await }
	});

	// Two retryable refusals, then success: three attempts total.
	for _ in 0..2 {
		let frame = stick_read(&mut rig.stick).await;
		let reply = [
			mci::PT_STATUS,
			mci::STT_ERROR,
			mci::STS_BUSY_MRF,
			tx_seq(&frame) << 4,
		];
		stick_write(&mut rig.stick, &reply).await;
	}
	let frame = stick_read(&mut rig.stick).await;
	stick_write(&mut rig.stick, &ok_mrf_reply(tx_seq(&frame), mci::OKMRF_NOINFO)).await;

	assert!(caller.await.unwrap().unwrap().is_some());
	rig.shutdown().await;
}

#[tokio::test]
async fn non_retryable_errors_propagate() {
	let mut rig = Rig::start(&[(17, "lamp", 4711, 16, 0)]).await;
	let dp = rig.iface.datapoint(17).unwrap();

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.switch(&dp, true).await }
	});

	let frame = stick_read(&mut rig.stick).await;
	// General errors carry a detail byte; the sequence tag moves one slot
	// further out.
	let reply = [
		mci::PT_STATUS,
		mci::STT_ERROR,
		mci::STS_GENERAL,
		mci::ERR_T_SWITCH,
		tx_seq(&frame) << 4,
	];
	stick_write(&mut rig.stick, &reply).await;

	let err = caller.await.unwrap().unwrap_err();
	assert!(matches!(err, Error::General(detail) if detail == mci::ERR_T_SWITCH));

	// No retry attempt was made for it.
	rig.token.cancel();
	rig.engine.await.unwrap().unwrap();
	assert_eq!(timeout(Duration::from_secs(1), try_stick_read(&mut rig.stick))
		.await
		.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn silent_loss_ages_out_as_no_ack() {
	let mut rig = Rig::start(&[(17, "lamp", 4711, 16, 0)]).await;
	let dp = rig.iface.datapoint(17).unwrap();
	let started = tokio::time::Instant::now();

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.switch(&dp, true).await }
	});

	// The stick swallows the command and both retries; each attempt is
	// aged out by the ten-second watchdog.
	for _ in 0..3 {
		let frame = stick_read(&mut rig.stick).await;
		assert_eq!(frame[..4], [mci::PT_TX, 17, mci::TE_SWITCH, mci::TED_ON]);
	}

	let err = caller.await.unwrap().unwrap_err();
	assert!(matches!(err, Error::NoAck));

	let elapsed = started.elapsed();
	assert!(elapsed >= Duration::from_secs(30), "elapsed {elapsed:?}");
	assert!(elapsed < Duration::from_secs(31), "elapsed {elapsed:?}");

	rig.shutdown().await;
}

#[tokio::test]
async fn cancel_releases_parked_callers() {
	let mut rig = Rig::start(&[
		(1, "a", 101, 16, 0),
		(2, "b", 102, 16, 0),
		(3, "c", 103, 16, 0),
	])
	.await;

	let mut callers = Vec::new();
	for number in 1..=3u8 {
		let iface = rig.iface.clone();
		let dp = rig.iface.datapoint(number).unwrap();
		callers.push(tokio::spawn(async move { iface.switch(&dp, true).await }));
	}
	for _ in 0..3 {
		stick_read(&mut rig.stick).await;
	}

	rig.token.cancel();
	for caller in callers {
		let err = timeout(Duration::from_secs(1), caller)
			.await
			.unwrap()
			.unwrap()
			.unwrap_err();
		assert!(matches!(err, Error::Terminal));
	}
	rig.engine.await.unwrap().unwrap();

	// The engine wrote nothing after the cancellation.
	assert_eq!(timeout(Duration::from_secs(1), try_stick_read(&mut rig.stick))
		.await
		.unwrap(), None);
}

#[tokio::test]
async fn config_queries() {
	let mut rig = Rig::start(&[]).await;

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.serial().await }
	});
	let frame = stick_read(&mut rig.stick).await;
	assert_eq!(frame, [mci::PT_CONFIG, mci::CONF_SERIAL, mci::CF_DATA_GET]);
	stick_write(
		&mut rig.stick,
		&[mci::PT_STATUS, mci::STT_SERIAL, 0x00, 0x00, 0xc0, 0xff, 0xee],
	)
	.await;
	assert_eq!(caller.await.unwrap().unwrap(), 0x00c0_ffee);

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.release().await }
	});
	let frame = stick_read(&mut rig.stick).await;
	assert_eq!(frame, [mci::PT_CONFIG, mci::CONF_RELEASE, mci::CF_DATA_GET]);
	stick_write(
		&mut rig.stick,
		&[mci::PT_STATUS, mci::STT_RELEASE, 0x00, 1, 12, 2, 5],
	)
	.await;
	let (rf, fw) = caller.await.unwrap().unwrap();
	assert!(float_cmp::approx_eq!(f32, rf, 1.12, epsilon = 0.001));
	assert!(float_cmp::approx_eq!(f32, fw, 2.05, epsilon = 0.001));

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.set_ok_mrf().await }
	});
	let frame = stick_read(&mut rig.stick).await;
	assert_eq!(frame, [mci::PT_CONFIG, mci::CONF_SEND_OK_MRF, mci::CF_DATA_SET]);
	stick_write(&mut rig.stick, &[mci::PT_STATUS, mci::STT_SEND_OK_MRF, 0x01]).await;
	caller.await.unwrap().unwrap();

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.counter_tx().await }
	});
	let frame = stick_read(&mut rig.stick).await;
	assert_eq!(frame, [mci::PT_CONFIG, mci::CONF_COUNTER_TX, mci::CF_DATA_GET]);
	stick_write(
		&mut rig.stick,
		&[mci::PT_STATUS, mci::STT_COUNTER_TX, 0x00, 0, 0, 1, 2],
	)
	.await;
	assert_eq!(caller.await.unwrap().unwrap(), 258);

	rig.shutdown().await;
}

#[tokio::test]
async fn rx_value_event_is_decoded() {
	let mut rig = Rig::start(&[(42, "temp", 4711, 23, 0)]).await;

	// UINT16_1POINT carrying 210 decodes as 21.0 degrees.
	stick_write(
		&mut rig.stick,
		&[
			mci::PT_RX,
			42,
			mci::RX_EVENT_VALUE,
			mci::RDT_UINT16_1POINT,
			0x00,
			0x00,
			0xd2,
			0x00,
			0x00,
			50,
			0x04,
		],
	)
	.await;

	rig.recorder
		.wait_for(&Call::ValueEvent(42, "value".into(), 21.0))
		.await;
	let calls = rig.recorder.calls();
	assert!(calls.contains(&Call::Rssi(4711, 50)));
	assert!(calls.contains(&Call::Battery(4711, 80)));

	rig.shutdown().await;
}

#[tokio::test]
async fn rx_pushbutton_event() {
	let mut rig = Rig::start(&[(42, "button", 4711, 2, 1)]).await;

	stick_write(
		&mut rig.stick,
		&[
			mci::PT_RX,
			42,
			mci::RX_EVENT_UP_PRESSED,
			mci::RDT_NO_DATA,
			0x00,
			0x00,
			0x00,
			0x00,
			0x00,
			60,
			0x20 | 0x03,
		],
	)
	.await;

	rig.recorder
		.wait_for(&Call::Event(42, "upPressed".into()))
		.await;
	let calls = rig.recorder.calls();
	// Exactly one telemetry update per frame.
	assert_eq!(
		calls.iter().filter(|call| matches!(call, Call::Rssi(..))).count(),
		1
	);
	assert_eq!(calls, vec![
		Call::Rssi(4711, 60),
		Call::Battery(4711, 60),
		Call::Event(42, "upPressed".into()),
	]);

	rig.shutdown().await;
}

#[tokio::test]
async fn rx_switch_status() {
	let mut rig = Rig::start(&[(17, "lamp", 4711, 16, 0)]).await;

	stick_write(
		&mut rig.stick,
		&[
			mci::PT_RX,
			17,
			mci::RX_EVENT_STATUS,
			0x00,
			mci::RX_IS_ON,
			0x00,
			0x00,
			0x00,
			0x00,
			40,
			0x10,
		],
	)
	.await;

	rig.recorder.wait_for(&Call::StatusBool(17, true)).await;
	rig.shutdown().await;
}

#[tokio::test]
async fn extended_status_switch_report() {
	let mut rig = Rig::start(&[(17, "lamp", 4711, 74, 0), (18, "input", 4711, 74, 1)]).await;

	// Serial-addressed extended status: CSAU-01/01-16IE, output on,
	// 35 degrees, 12.3 watts.
	stick_write(
		&mut rig.stick,
		&[
			mci::PT_RX,
			0,
			mci::RX_EVENT_STATUS_EXT,
			mci::RDT_SERIAL_NUMBER,
			0x00,
			0x67,
			0x12,
			0x00,
			0x00, // serial 4711 little-endian
			74,   // device type
			7,    // subtype 16IE
			0x20, // output state On in the high nibble
			35,   // internal temperature
			123,
			0, // power, tenths of a watt little-endian
			0x00,
			60, // rssi
			16, // battery: mains powered
		],
	)
	.await;

	rig.recorder.wait_for(&Call::StatusBool(17, true)).await;
	let calls = rig.recorder.calls();
	assert!(calls.contains(&Call::InternalTemperature(4711, 35)));
	assert!(calls.contains(&Call::Power(4711, 12.3)));
	assert!(calls.contains(&Call::Rssi(4711, 60)));
	assert_eq!(rig.iface.device(4711).unwrap().subtype(), 7);

	rig.shutdown().await;
}

#[tokio::test]
async fn shutter_command_and_status() {
	let mut rig = Rig::start(&[(9, "blind", 555, 18, 0)]).await;
	let dp = rig.iface.datapoint(9).unwrap();

	let caller = tokio::spawn({
		let iface = rig.iface.clone();
		async move { iface.shutter(&dp, xcomfort::ShutterCommand::Close).await }
	});
	let frame = stick_read(&mut rig.stick).await;
	assert_eq!(frame[..4], [mci::PT_TX, 9, mci::TE_JALO, mci::TED_CLOSE]);
	stick_write(&mut rig.stick, &ok_mrf_reply(tx_seq(&frame), mci::OKMRF_ACK_DIRECT)).await;
	caller.await.unwrap().unwrap();

	stick_write(
		&mut rig.stick,
		&[
			mci::PT_RX,
			9,
			mci::RX_EVENT_STATUS,
			0x00,
			mci::RX_IS_CLOSE,
			0x00,
			0x00,
			0x00,
			0x00,
			45,
			0x10,
		],
	)
	.await;
	rig.recorder
		.wait_for(&Call::StatusShutter(9, ShutterStatus::Closing))
		.await;

	rig.shutdown().await;
}

/// Minimal binary DPL container, mirroring the vendor layout.
fn build_dpl_image(records: &[(u8, &str, u32, u8, u8)]) -> Vec<u8> {
	const EXT_HEADER_LEN: usize = 120;
	const EXT_ENTRY_LEN: usize = 64;

	let n = records.len();
	let extended_offset = 16 + 16 * n;
	let text_offset = extended_offset + EXT_HEADER_LEN + EXT_ENTRY_LEN * n;

	let mut image = vec![0u8; 16];
	image[0] = mci::DPL_TYPE_EXT2;
	image[8] = (n >> 8) as u8 & 0x0f;
	image[9] = n as u8;
	image[11] = EXT_HEADER_LEN as u8;
	image[12..16].copy_from_slice(&(extended_offset as u32).to_le_bytes());

	for (number, _, serial, device_type, channel) in records {
		let mut entry = [0u8; 16];
		entry[0..2].copy_from_slice(&u16::from(*number).to_le_bytes());
		entry[2..6].copy_from_slice(&serial.to_le_bytes());
		entry[6..8].copy_from_slice(&u16::from(*device_type).to_le_bytes());
		entry[8] = *channel;
		entry[11] = EXT_ENTRY_LEN as u8;
		image.extend_from_slice(&entry);
	}

	let mut extended_header = [0u8; EXT_HEADER_LEN];
	extended_header[116..120].copy_from_slice(&(text_offset as u32).to_le_bytes());
	image.extend_from_slice(&extended_header);

	for (_, name, ..) in records {
		let mut entry = [0u8; EXT_ENTRY_LEN];
		entry[..name.len()].copy_from_slice(name.as_bytes());
		image.extend_from_slice(&entry);
	}

	image
}

#[tokio::test]
async fn dpl_change_notification_reloads_registry() {
	let rig = Rig::start(&[(17, "lamp", 4711, 16, 0)]).await;
	let mut stick = rig.stick;

	let image = build_dpl_image(&[(21, "New lamp", 777, 16, 0)]);

	stick_write(&mut stick, &[mci::PT_EXTENDED, mci::ET_DPL_CHANGED]).await;

	// Serve EPROM pages until the engine stops asking.
	let server = tokio::spawn(async move {
		while let Some(frame) = try_stick_read(&mut stick).await {
			let position = match frame[..] {
				[mci::PT_EXTENDED, mci::ET_REQU_DPL, ..] => 0usize,
				[mci::PT_EXTENDED, mci::ET_RD, a, b, c, d, ..] => {
					u32::from_le_bytes([a, b, c, d]) as usize
				}
				_ => panic!("unexpected frame {frame:?}"),
			};
			let tag = if position == 0 {
				mci::ET_SEND_DPL
			} else {
				mci::ET_REPLY
			};
			let end = (position + 10).min(image.len());
			let mut reply = vec![mci::PT_EXTENDED, tag];
			reply.extend_from_slice(&(position as u32).to_le_bytes());
			reply.extend_from_slice(&[0, 0]);
			reply.extend_from_slice(&image[position..end]);
			stick_write(&mut stick, &reply).await;
		}
	});

	rig.recorder.wait_for(&Call::DplChanged).await;

	let dp = rig.iface.datapoint(21).expect("registry not swapped");
	assert_eq!(dp.name(), "New lamp");
	assert_eq!(dp.device().serial_number(), 777);
	// The old topology is gone.
	assert!(rig.iface.datapoint(17).is_none());
	assert_eq!(
		rig.recorder
			.calls()
			.iter()
			.filter(|call| matches!(call, Call::DplChanged))
			.count(),
		1
	);

	rig.token.cancel();
	rig.engine.await.unwrap().unwrap();
	server.abort();
}
