use bytes::Bytes;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use uble_codec::{
    BLE_CODEC, BleValue, Characteristic, ManufacturerData, ScanResult, Service, Value,
};

fn scan_result(i: usize) -> ScanResult {
    ScanResult {
        device_id: format!("C0:FF:EE:00:{:02X}:{:02X}", i / 256, i % 256),
        name: Some(format!("sensor-{i}")),
        is_paired: Some(i % 2 == 0),
        rssi: Some(-40 - (i % 50) as i64),
        manufacturer_data_list: Some(vec![ManufacturerData::new(
            76,
            Bytes::from(vec![i as u8; 24]),
        )]),
        services: Some(vec![Service::new(
            "180d",
            Some(vec![Characteristic::new("2a37", vec![1, 4])]),
        )]),
    }
}

fn bench_encode(c: &mut Criterion) {
    let single: BleValue = Value::List(vec![scan_result(0).into()]);
    let batch: BleValue = Value::List(vec![Value::List(
        (0..256).map(|i| scan_result(i).into()).collect(),
    )]);

    let mut group = c.benchmark_group("ble_codec_encode");

    group.bench_function("scan_result_event", |b| {
        b.iter(|| BLE_CODEC.encode_message(black_box(&single)).unwrap());
    });

    group.bench_function("system_devices_256", |b| {
        b.iter(|| BLE_CODEC.encode_message(black_box(&batch)).unwrap());
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let single = BLE_CODEC
        .encode_message(&Value::List(vec![scan_result(0).into()]))
        .unwrap();
    let batch = BLE_CODEC
        .encode_message(&Value::List(vec![Value::List(
            (0..256).map(|i| scan_result(i).into()).collect(),
        )]))
        .unwrap();

    let mut group = c.benchmark_group("ble_codec_decode");

    group.bench_function("scan_result_event", |b| {
        b.iter(|| BLE_CODEC.decode_message(black_box(single.clone())).unwrap());
    });

    group.bench_function("system_devices_256", |b| {
        b.iter(|| BLE_CODEC.decode_message(black_box(batch.clone())).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
