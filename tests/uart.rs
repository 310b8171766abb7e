use wbuart_sim::{
    BusRequest, FrameConfig, SimConfig, Uart,
    frame::parity_bit,
    registers::{
        CR_OFFSET, DataBits, ParityMode, RXDR_OFFSET, SR_OFFSET, Status, StopBits, TXDR_OFFSET,
    },
};

/// 8 data bits, odd parity, 1 stop bit, 4 clocks per bit.
const CR_8O1_QUARTER: u32 = (16384 << 16) | (1 << 3) | 0b01;

const DATA_BITS: [DataBits; 2] = [DataBits::Seven, DataBits::Eight];
const PARITIES: [ParityMode; 3] = [ParityMode::NoParity, ParityMode::Odd, ParityMode::Even];
const STOP_BITS: [StopBits; 2] = [StopBits::One, StopBits::Two];

fn write(uart: &mut Uart, addr: u32, value: u32) {
    assert!(uart.tick(BusRequest::write(addr, value)).ack);
    uart.idle_tick();
}

fn read(uart: &mut Uart, addr: u32) -> u32 {
    let response = uart.tick(BusRequest::read(addr));
    assert!(response.ack);
    uart.idle_tick();
    response.data
}

fn read_status(uart: &mut Uart) -> Status {
    Status::new_with_raw_value(read(uart, SR_OFFSET))
}

fn wait_for(uart: &mut Uart, max_clocks: u32, mut cond: impl FnMut(&Uart) -> bool) -> u32 {
    for clock in 0..max_clocks {
        if cond(uart) {
            return clock;
        }
        uart.idle_tick();
    }
    panic!("condition not reached within {max_clocks} clocks");
}

fn quarter_rate(data_bits: DataBits, parity: ParityMode, stop_bits: StopBits) -> FrameConfig {
    FrameConfig::from_baud(6_000_000, 24_000_000)
        .unwrap()
        .with_data_bits(data_bits)
        .with_parity(parity)
        .with_stop_bits(stop_bits)
}

#[derive(Default, Copy, Clone)]
struct Inject {
    flip_parity: bool,
    low_stop: bool,
}

/// Line levels of one frame, one entry per bit period.
fn frame_bits(cfg: &FrameConfig, byte: u8, inject: Inject) -> Vec<bool> {
    let mut bits = vec![false];
    bits.extend((0..cfg.data_bits.count()).map(|i| (byte >> i) & 1 == 1));
    if cfg.parity.enabled() {
        bits.push(parity_bit(byte, cfg.data_bits, cfg.parity) ^ inject.flip_parity);
    }
    bits.extend((0..cfg.stop_bits.count()).map(|_| !inject.low_stop));
    // Idle gap so the next start bit produces a falling edge.
    bits.extend([true; 2]);
    bits
}

/// Expands bit periods of 4 clocks into per-clock RX pin levels.
fn pin_levels(bits: &[bool]) -> Vec<bool> {
    bits.iter().flat_map(|&bit| [bit; 4]).collect()
}

fn drive_rx(uart: &mut Uart, levels: &[bool]) {
    for &level in levels {
        uart.set_rx(level);
        uart.idle_tick();
    }
    uart.set_rx(true);
    uart.run(16);
}

#[test]
fn idle_invariants() {
    let mut uart = Uart::default();
    uart.run(100);
    assert!(uart.tx());
    assert!(uart.rx_engine().is_idle());
    assert!(uart.tx_engine().is_idle());
    assert_eq!(read(&mut uart, SR_OFFSET), 0x2);
    assert_eq!(read(&mut uart, CR_OFFSET), 0);
    assert_eq!(read(&mut uart, RXDR_OFFSET), 0);
    assert_eq!(read(&mut uart, TXDR_OFFSET), 0);
    assert_eq!(read(&mut uart, SR_OFFSET), 0x2);
}

#[test]
fn loopback_round_trip_all_formats() {
    let mut uart = Uart::new(SimConfig::default().with_loopback(true));
    for data_bits in DATA_BITS {
        for parity in PARITIES {
            for stop_bits in STOP_BITS {
                let cfg = quarter_rate(data_bits, parity, stop_bits);
                write(&mut uart, CR_OFFSET, cfg.to_control().raw_value());
                for byte in [0x00, 0xA5, 0x5A, 0xFF, 0x81] {
                    wait_for(&mut uart, 100, |u| u.registers().status().txe());
                    write(&mut uart, TXDR_OFFSET, byte as u32);
                    wait_for(&mut uart, 100, |u| u.registers().status().rxne());
                    let data = read(&mut uart, RXDR_OFFSET);
                    assert_eq!(
                        data,
                        u32::from(byte & data_bits.mask()),
                        "{cfg:?}, byte {byte:#04x}"
                    );
                    let sr = read_status(&mut uart);
                    assert!(!sr.has_errors(), "{cfg:?}, byte {byte:#04x}: {sr:?}");
                    assert!(!sr.rxne());
                }
            }
        }
    }
}

#[test]
fn odd_parity_a5_at_four_clocks_per_bit() {
    let mut uart = Uart::new(SimConfig::default().with_loopback(true));
    write(&mut uart, CR_OFFSET, CR_8O1_QUARTER);
    assert_eq!(read(&mut uart, CR_OFFSET), CR_8O1_QUARTER);
    write(&mut uart, TXDR_OFFSET, 0xA5);

    // Counted from the clock after the TXDR write. The transmitter finishes the 11 bit periods
    // of 4 clocks first, the receiver delivers at the middle of the stop bit, delayed by the
    // three input registering stages.
    let mut lookahead = uart.clone();
    let done_after = wait_for(&mut lookahead, 100, |u| u.tx_done());
    assert_eq!(done_after, 44);
    let latency = wait_for(&mut uart, 100, |u| u.rx_valid());
    assert_eq!(latency, 46);

    let sr = read_status(&mut uart);
    assert!(sr.rxne());
    assert!(!sr.has_errors());
    assert_eq!(read(&mut uart, RXDR_OFFSET), 0xA5);
    let sr = read_status(&mut uart);
    assert!(!sr.rxne());
    assert_eq!(sr.raw_value(), 0x2);
}

#[test]
fn parity_error_keeps_data() {
    let mut uart = Uart::default();
    let cfg = quarter_rate(DataBits::Eight, ParityMode::Even, StopBits::One);
    write(&mut uart, CR_OFFSET, cfg.to_control().raw_value());
    let inject = Inject {
        flip_parity: true,
        ..Default::default()
    };
    drive_rx(&mut uart, &pin_levels(&frame_bits(&cfg, 0x3C, inject)));

    let sr = read_status(&mut uart);
    assert!(sr.pe() && sr.rxne());
    assert!(!sr.fe() && !sr.rxoe());
    assert_eq!(read(&mut uart, RXDR_OFFSET), 0x3C);
    assert_eq!(read(&mut uart, SR_OFFSET), 0x2);
}

#[test]
fn low_stop_bit_sets_framing_error() {
    let mut uart = Uart::default();
    let cfg = quarter_rate(DataBits::Seven, ParityMode::NoParity, StopBits::Two);
    write(&mut uart, CR_OFFSET, cfg.to_control().raw_value());
    let inject = Inject {
        low_stop: true,
        ..Default::default()
    };
    drive_rx(&mut uart, &pin_levels(&frame_bits(&cfg, 0x7E, inject)));

    let sr = read_status(&mut uart);
    assert!(sr.fe() && sr.rxne());
    assert!(!sr.pe());
    assert_eq!(read(&mut uart, RXDR_OFFSET), 0x7E);
}

#[test]
fn sticky_errors_survive_clean_frames() {
    let mut uart = Uart::default();
    let cfg = quarter_rate(DataBits::Eight, ParityMode::Odd, StopBits::One);
    write(&mut uart, CR_OFFSET, cfg.to_control().raw_value());

    let mut bits = frame_bits(
        &cfg,
        0x11,
        Inject {
            flip_parity: true,
            ..Default::default()
        },
    );
    bits.extend(frame_bits(
        &cfg,
        0x22,
        Inject {
            low_stop: true,
            ..Default::default()
        },
    ));
    bits.extend(frame_bits(&cfg, 0x33, Inject::default()));
    drive_rx(&mut uart, &pin_levels(&bits));

    // Side effect free inspection first.
    assert_eq!(uart.registers().status().raw_value(), 0x1F);
    assert_eq!(read(&mut uart, SR_OFFSET), 0x1F);
    assert_eq!(read(&mut uart, SR_OFFSET), 0x3);
    assert_eq!(read(&mut uart, RXDR_OFFSET), 0x33);
    assert_eq!(read(&mut uart, SR_OFFSET), 0x2);
}

#[test]
fn sr_read_on_the_clock_of_a_new_error() {
    let mut uart = Uart::default();
    let cfg = quarter_rate(DataBits::Eight, ParityMode::Even, StopBits::One);
    write(&mut uart, CR_OFFSET, cfg.to_control().raw_value());

    // A framing error first, left unread.
    let mut bits = frame_bits(
        &cfg,
        0x01,
        Inject {
            low_stop: true,
            ..Default::default()
        },
    );
    bits.extend(frame_bits(
        &cfg,
        0x02,
        Inject {
            flip_parity: true,
            ..Default::default()
        },
    ));
    let mut pins = pin_levels(&bits);
    pins.extend([true; 16]);

    // Find the clock on which the second frame is delivered.
    let mut lookahead = uart.clone();
    let mut deliveries = Vec::new();
    for (clock, &level) in pins.iter().enumerate() {
        lookahead.set_rx(level);
        lookahead.idle_tick();
        if lookahead.rx_valid() {
            deliveries.push(clock);
        }
    }
    assert_eq!(deliveries.len(), 2);
    let race_clock = deliveries[1];

    let mut sr_read = None;
    for (clock, &level) in pins.iter().enumerate() {
        uart.set_rx(level);
        if clock == race_clock {
            let response = uart.tick(BusRequest::read(SR_OFFSET));
            assert!(uart.rx_valid());
            sr_read = Some(Status::new_with_raw_value(response.data));
        } else {
            uart.idle_tick();
        }
    }
    let sr_read = sr_read.unwrap();
    assert!(sr_read.pe() && sr_read.fe() && sr_read.rxoe() && sr_read.rxne());

    // FE was cleared by the read. PE and RXOE were latched on the same clock and survive it.
    let after = uart.registers().status();
    assert!(after.pe() && after.rxoe() && after.rxne());
    assert!(!after.fe());
    assert_eq!(read(&mut uart, RXDR_OFFSET), 0x02);
}

#[test]
fn txdr_write_while_busy_is_dropped() {
    let mut reference = Uart::default();
    write(&mut reference, CR_OFFSET, CR_8O1_QUARTER);
    let mut uart = reference.clone();

    let mut expected = Vec::new();
    reference.tick(BusRequest::write(TXDR_OFFSET, 0x55));
    for _ in 0..60 {
        reference.idle_tick();
        expected.push(reference.tx());
    }

    let mut actual = Vec::new();
    uart.tick(BusRequest::write(TXDR_OFFSET, 0x55));
    assert!(!uart.registers().status().txe());
    for clock in 0..60 {
        if clock == 12 {
            assert!(uart.tick(BusRequest::write(TXDR_OFFSET, 0xFF)).ack);
        } else {
            uart.idle_tick();
        }
        actual.push(uart.tx());
        if uart.tx_engine().is_idle() {
            assert!(uart.registers().status().txe());
        } else {
            assert!(!uart.registers().status().txe());
        }
    }
    assert_eq!(actual, expected);
    // Start bit and the four zero data bits of 0x55, 4 clocks each. Odd parity bit is high.
    assert_eq!(expected.iter().filter(|&&level| !level).count(), 20);
    assert_eq!(read(&mut uart, TXDR_OFFSET), 0x55);
    assert!(uart.tx_engine().is_idle());
    assert_eq!(read(&mut uart, SR_OFFSET), 0x2);
}

#[test]
fn txdr_read_back_is_masked() {
    let mut uart = Uart::default();
    write(&mut uart, TXDR_OFFSET, 0x1A5);
    assert_eq!(read(&mut uart, TXDR_OFFSET), 0xA5);
}

#[test]
fn two_peripherals_at_115200() {
    let cfg = FrameConfig::from_baud(115_200, 24_000_000)
        .unwrap()
        .with_parity(ParityMode::Even)
        .with_stop_bits(StopBits::Two);
    assert_eq!(cfg.baud_increment.value(), 315);
    let cr = cfg.to_control().raw_value();

    let mut a = Uart::default();
    let mut b = Uart::default();
    write(&mut a, CR_OFFSET, cr);
    write(&mut b, CR_OFFSET, cr);

    let mut received = Vec::new();
    for byte in *b"wishbone" {
        a.tick(BusRequest::write(TXDR_OFFSET, byte as u32));
        for _ in 0..4000 {
            b.set_rx(a.tx());
            a.set_rx(b.tx());
            a.idle_tick();
            b.idle_tick();
            if b.registers().status().rxne() {
                break;
            }
        }
        assert!(b.registers().status().rxne());
        received.push(read(&mut b, RXDR_OFFSET) as u8);
        assert!(!read_status(&mut b).has_errors());
        wait_for(&mut a, 500, |u| u.registers().status().txe());
    }
    assert_eq!(received, b"wishbone");
}

#[test]
fn registering_delay_shifts_reception() {
    let mut latencies = Vec::new();
    for stages in [0, 3, 8] {
        let config = SimConfig::default()
            .with_loopback(true)
            .with_sync_stages(stages)
            .unwrap();
        let mut uart = Uart::new(config);
        write(&mut uart, CR_OFFSET, CR_8O1_QUARTER);
        write(&mut uart, TXDR_OFFSET, 0x42);
        latencies.push(wait_for(&mut uart, 100, |u| u.rx_valid()));
        assert_eq!(read(&mut uart, RXDR_OFFSET), 0x42);
    }
    assert_eq!(latencies[1] - latencies[0], 3);
    assert_eq!(latencies[2] - latencies[0], 8);
}

#[test]
fn config_change_applies_to_next_frame() {
    let mut uart = Uart::new(SimConfig::default().with_loopback(true));
    let eight_n1 = quarter_rate(DataBits::Eight, ParityMode::NoParity, StopBits::One);
    let seven_e2 = quarter_rate(DataBits::Seven, ParityMode::Even, StopBits::Two);
    write(&mut uart, CR_OFFSET, eight_n1.to_control().raw_value());
    write(&mut uart, TXDR_OFFSET, 0xC3);
    uart.run(6);
    // Mid-frame reconfiguration of both engines.
    write(&mut uart, CR_OFFSET, seven_e2.to_control().raw_value());
    wait_for(&mut uart, 100, |u| u.registers().status().rxne());
    assert_eq!(read(&mut uart, RXDR_OFFSET), 0xC3);
    assert!(!read_status(&mut uart).has_errors());

    wait_for(&mut uart, 100, |u| u.registers().status().txe());
    write(&mut uart, TXDR_OFFSET, 0xC3);
    wait_for(&mut uart, 100, |u| u.registers().status().rxne());
    assert_eq!(read(&mut uart, RXDR_OFFSET), 0x43);
    assert!(!read_status(&mut uart).has_errors());
}
