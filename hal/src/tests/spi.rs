use crate::error::ErrorKind;
use crate::mock::{bytes, MockSpi, Reply, SpiCall};
use crate::spi::{BitOrder, SpiCapabilities, SpiConfig, SpiMaster};
use crate::{Lifecycle, LifecycleState};

fn configured(mock: &mut MockSpi) -> SpiMaster<'_, MockSpi> {
    let mut bus = SpiMaster::new(0, mock);
    bus.init().unwrap();
    bus.set_config(&SpiConfig::default().with_fill(0x5A)).unwrap();
    bus
}

#[test]
fn empty_transfer_has_no_side_effects() {
    let mut mock = MockSpi::new();
    let mut bus = configured(&mut mock);
    assert_eq!(bus.transfer(&[], &mut []), Ok(()));
    assert_eq!(bus.write(&[]), Ok(()));
    assert_eq!(bus.read(&mut []), Ok(()));
    drop(bus);
    assert!(mock.calls().is_empty());
}

#[test]
fn short_output_is_padded_with_fill() {
    let mut mock = MockSpi::new();
    let mut bus = configured(&mut mock);
    let mut input = [0u8; 4];
    bus.transfer(&[1, 2], &mut input).unwrap();
    // The mock loops MOSI back to MISO
    assert_eq!(input, [1, 2, 0x5A, 0x5A]);
    drop(bus);
    assert_eq!(
        mock.calls(),
        &[SpiCall::Transfer {
            output: bytes(&[1, 2]),
            len: 4,
            fill: 0x5A,
        }]
    );
}

#[test]
fn long_output_is_invalid_argument() {
    let mut mock = MockSpi::new();
    let mut bus = configured(&mut mock);
    assert_eq!(
        bus.transfer(&[1, 2, 3], &mut [0u8; 2]),
        Err(ErrorKind::InvalidArgument)
    );
    assert_eq!(bus.transfer(&[1], &mut []), Err(ErrorKind::InvalidArgument));
    drop(bus);
    assert!(mock.calls().is_empty());
}

#[test]
fn read_clocks_out_fill() {
    let mut mock = MockSpi::new();
    mock.queue(Reply::Data(bytes(&[0xDE, 0xAD]))).unwrap();
    let mut bus = configured(&mut mock);
    let mut input = [0u8; 2];
    bus.read(&mut input).unwrap();
    assert_eq!(input, [0xDE, 0xAD]);
    drop(bus);
    assert!(matches!(
        mock.calls(),
        [SpiCall::Transfer { output, len: 2, fill: 0x5A }] if output.is_empty()
    ));
}

#[test]
fn transfer_in_place_chunks() {
    let mut mock = MockSpi::new();
    let mut bus = configured(&mut mock);
    let mut words = [0u8; 100];
    for (i, w) in words.iter_mut().enumerate() {
        *w = i as u8;
    }
    let expected = words;
    bus.transfer_in_place(&mut words).unwrap();
    assert_eq!(words, expected);
    drop(bus);
    assert_eq!(mock.calls().len(), 2);
}

#[test]
fn not_configured_before_set_config() {
    let mut mock = MockSpi::new();
    let mut bus = SpiMaster::new(1, &mut mock);
    assert_eq!(bus.write(&[1]), Err(ErrorKind::NotConfigured));
    bus.init().unwrap();
    assert_eq!(bus.transfer(&[], &mut [0u8; 1]), Err(ErrorKind::NotConfigured));
    // The state check comes before argument validation
    assert_eq!(bus.transfer(&[1, 2], &mut []), Err(ErrorKind::NotConfigured));
    assert_eq!(bus.state(), LifecycleState::Initialized);
    drop(bus);
    assert!(mock.calls().is_empty());
}

#[test]
fn capability_checks() {
    let mut mock = MockSpi::new();
    mock.capabilities = SpiCapabilities {
        max_frequency: 4_000_000,
        lsb_first: false,
    };
    let mut bus = SpiMaster::new(0, &mut mock);
    bus.init().unwrap();
    let base = SpiConfig::default();
    assert_eq!(
        bus.set_config(&base.with_frequency(8_000_000)),
        Err(ErrorKind::InvalidConfig)
    );
    assert_eq!(
        bus.set_config(&base.with_bit_order(BitOrder::LsbFirst)),
        Err(ErrorKind::InvalidConfig)
    );
    assert_eq!(bus.set_config(&base.with_frequency(0)), Err(ErrorKind::InvalidConfig));
    bus.set_config(&base.with_frequency(4_000_000)).unwrap();
    assert_eq!(bus.context().config().map(|c| c.frequency), Some(4_000_000));
}
