mod common;

use common::{Op, RecordingDelay, SimDevice, SimError};
use veml7700_autorange::measurement::correction_curve;
use veml7700_autorange::{
    GainLevel, IntegrationLevel, LightSensor, PersistenceLevel, RangeOutcome, RangeState,
    SensorConfig, SensorError, CHANNELS, SENSOR_TYPE,
};

#[test]
fn begin_applies_configuration() {
    let mut sim = SimDevice::new(RangeState::MOST_SENSITIVE, 10.0);
    let config = SensorConfig {
        persistence: PersistenceLevel::Samples4,
        ..SensorConfig::default()
    };
    let mut sensor = LightSensor::new(&mut sim, RecordingDelay::default(), config);
    sensor.begin().unwrap();
    assert_eq!(sensor.config(), &config);
    drop(sensor);

    assert_eq!(
        sim.ops,
        vec![
            Op::Begin,
            Op::SetPersistence(PersistenceLevel::Samples4),
            Op::SetGain(GainLevel::Gain1_4x),
            Op::SetIntegration(IntegrationLevel::Ms100),
        ]
    );
    assert_eq!(sim.state, config.range_state());
}

#[test]
fn missing_device_fails_startup() {
    let mut sim = SimDevice::new(RangeState::MOST_SENSITIVE, 10.0);
    sim.present = false;
    let mut sensor = LightSensor::new(&mut sim, RecordingDelay::default(), SensorConfig::default());
    assert_eq!(sensor.begin(), Err(SensorError::Init(SimError::NotDetected)));
    drop(sensor);
    assert_eq!(sim.ops, vec![Op::Begin]);
}

#[test]
fn fixed_range_measurement_compensates_low_gain() {
    let start = RangeState::new(GainLevel::Gain1_4x, IntegrationLevel::Ms100);
    let mut sim = SimDevice::new(start, 50.0);
    let mut sensor = LightSensor::new(&mut sim, RecordingDelay::default(), SensorConfig::default());
    sensor.begin().unwrap();

    let sample = sensor.measure().unwrap();
    assert_eq!(sample.ambient, 217);
    assert_eq!(sample.white, 260);
    let device_lux = 217.0 * start.resolution();
    assert!((sample.lux - correction_curve(device_lux)).abs() < 1e-9);
    assert!(sensor.last_adjustment().is_none());
    assert_eq!(sensor.values(), [217.0, 260.0, sample.lux]);
}

#[test]
fn compensation_can_be_disabled() {
    let start = RangeState::new(GainLevel::Gain1_8x, IntegrationLevel::Ms25);
    let mut sim = SimDevice::new(start, 5000.0);
    let config = SensorConfig {
        gain: start.gain,
        integration: start.integration,
        lux_compensation: false,
        ..SensorConfig::default()
    };
    let mut sensor = LightSensor::new(&mut sim, RecordingDelay::default(), config);
    sensor.begin().unwrap();

    let sample = sensor.measure().unwrap();
    assert_eq!(sample.lux, sample.ambient as f64 * start.resolution());
}

#[test]
fn auto_adjust_reads_after_reranging() {
    let mut sim = SimDevice::new(RangeState::new(GainLevel::Gain1_4x, IntegrationLevel::Ms100), 1.0);
    let config = SensorConfig {
        auto_adjust: true,
        ..SensorConfig::default()
    };
    let mut delay = RecordingDelay::default();
    let mut sensor = LightSensor::new(&mut sim, &mut delay, config);
    sensor.begin().unwrap();

    let sample = sensor.measure().unwrap();
    let settled = RangeState::new(GainLevel::Gain2x, IntegrationLevel::Ms400);
    let adjustment = sensor.last_adjustment().unwrap();
    assert_eq!(adjustment.outcome, RangeOutcome::Settled);
    assert_eq!(adjustment.state, settled);
    assert_eq!(sensor.config().range_state(), settled);

    // 2x gain below 1000 lux is left uncompensated
    assert_eq!(sample.ambient, 139);
    assert_eq!(sample.lux, 139.0 * settled.resolution());

    // Already in band: the next pass is a no-op
    sensor.measure().unwrap();
    assert_eq!(sensor.last_adjustment().unwrap().outcome, RangeOutcome::InRange);
    drop(sensor);
    assert_eq!(delay.waits_ms.len(), 6);
}

#[test]
fn apply_config_failure_keeps_previous() {
    let mut sim = SimDevice::new(RangeState::new(GainLevel::Gain1_4x, IntegrationLevel::Ms100), 1.0);
    sim.fail_set_gain = true;
    let mut sensor = LightSensor::new(&mut sim, RecordingDelay::default(), SensorConfig::default());

    let wanted = SensorConfig {
        gain: GainLevel::Gain2x,
        ..SensorConfig::default()
    };
    assert_eq!(
        sensor.apply_config(wanted),
        Err(SensorError::Apply(SimError::Nack))
    );
    assert_eq!(sensor.config(), &SensorConfig::default());
}

#[test]
fn channels_describe_sample() {
    assert_eq!(SENSOR_TYPE, "Ambient Light Sensor");
    let units: Vec<_> = CHANNELS.iter().map(|channel| channel.unit).collect();
    assert_eq!(units, ["raw", "raw", "lx"]);

    let sim = SimDevice::new(RangeState::MOST_SENSITIVE, 1.0);
    let sensor = LightSensor::new(sim, RecordingDelay::default(), SensorConfig::default());
    assert_eq!(sensor.values(), [0.0; 3]);
    assert!(sensor.last_sample().is_none());
}

#[cfg(feature = "config")]
mod stored {
    use super::*;
    use veml7700_autorange::{ConfigDocument, ConfigOrigin, MemoryConfigStore};

    #[test]
    fn stored_configuration_is_applied() {
        let stored = SensorConfig {
            auto_adjust: true,
            gain: GainLevel::Gain1x,
            integration: IntegrationLevel::Ms200,
            persistence: PersistenceLevel::Samples2,
            lux_compensation: false,
        };
        let mut store = MemoryConfigStore::new();
        ConfigDocument::new("Hallway", stored).save(&mut store).unwrap();

        let mut sim = SimDevice::new(RangeState::LEAST_SENSITIVE, 10.0);
        let mut sensor = LightSensor::new(&mut sim, RecordingDelay::default(), SensorConfig::default());
        let (document, origin) = sensor.begin_with_store(&mut store).unwrap();
        assert_eq!(origin, ConfigOrigin::Stored);
        assert_eq!(document.name, "Hallway");
        assert_eq!(sensor.config(), &stored);
        drop(sensor);

        assert_eq!(sim.state, stored.range_state());
        assert_eq!(sim.persistence, PersistenceLevel::Samples2);
    }

    #[test]
    fn malformed_configuration_is_repaired_on_startup() {
        let mut store = MemoryConfigStore::with_contents("{\"autoAdjust\": maybe}");
        let mut sim = SimDevice::new(RangeState::LEAST_SENSITIVE, 10.0);
        let mut sensor = LightSensor::new(&mut sim, RecordingDelay::default(), SensorConfig::default());

        let (_, origin) = sensor.begin_with_store(&mut store).unwrap();
        assert_eq!(origin, ConfigOrigin::Repaired);
        assert_eq!(sensor.config(), &SensorConfig::default());
        let repaired = ConfigDocument::from_json(store.contents().unwrap()).unwrap();
        assert_eq!(repaired.config, SensorConfig::default());
    }

    #[test]
    fn ranged_settings_can_be_saved() {
        let mut sim = SimDevice::new(RangeState::new(GainLevel::Gain1_4x, IntegrationLevel::Ms100), 1.0);
        let config = SensorConfig {
            auto_adjust: true,
            ..SensorConfig::default()
        };
        let mut sensor = LightSensor::new(&mut sim, RecordingDelay::default(), config);
        sensor.begin().unwrap();
        sensor.measure().unwrap();

        let mut store = MemoryConfigStore::new();
        sensor.save_config(&mut store, "Attic").unwrap();
        let (document, _) = ConfigDocument::load(&mut store);
        assert_eq!(document.name, "Attic");
        assert_eq!(document.config.gain, GainLevel::Gain2x);
        assert_eq!(document.config.integration, IntegrationLevel::Ms400);
    }
}
