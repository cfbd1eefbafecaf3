use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use redlilium_sync::{
    BufferData, ChangeQueue, DataType, DummyDevice, ImageRegion, Resource, ResourceManager,
    StorageMode, Texture, TextureDescriptor, TextureFormat, VertexBuffer,
};

// ---------------------------------------------------------------------------
// Change queue
// ---------------------------------------------------------------------------

fn bench_change_queue_record(c: &mut Criterion) {
    c.bench_function("change_queue_record_1000_edits", |b| {
        b.iter(|| {
            let queue = ChangeQueue::with_capacity(64);
            for i in 0..1000u32 {
                queue.record_edit(i);
            }
            black_box(queue.version());
        });
    });
}

fn bench_change_queue_drain(c: &mut Criterion) {
    let queue = ChangeQueue::with_capacity(256);
    for i in 0..256u32 {
        queue.record_edit(i);
    }
    let midpoint = queue.version() - 128;

    c.bench_function("change_queue_changes_since_128_of_256", |b| {
        b.iter(|| black_box(queue.changes_since(black_box(midpoint))));
    });
}

// ---------------------------------------------------------------------------
// Incremental sync
// ---------------------------------------------------------------------------

fn bench_buffer_incremental_sync(c: &mut Criterion) {
    let manager = ResourceManager::with_default_drivers();
    let buffer = VertexBuffer::new(BufferData::from_f32(&vec![0.0; 65536]), StorageMode::GpuStatic);
    let buffer = Arc::new(buffer);
    let resource = Resource::from(buffer.clone());
    let mut device = DummyDevice::new();
    manager.update(&mut device, &resource);

    c.bench_function("buffer_sync_16_small_writes", |b| {
        b.iter(|| {
            for i in 0..16 {
                buffer.write(i * 1024, &[1.0f32, 2.0, 3.0, 4.0]);
            }
            black_box(manager.update(&mut device, &resource));
            device.clear_calls();
        });
    });
}

fn bench_texture_region_sync(c: &mut Criterion) {
    let manager = ResourceManager::with_default_drivers();
    let texture = Arc::new(Texture::new(TextureDescriptor::new_2d(
        512,
        512,
        TextureFormat::Rgba,
        DataType::UnsignedByte,
    )));
    texture.set_image(0, 0, BufferData::from_u8(&vec![0; 512 * 512 * 4]));
    let resource = Resource::from(texture.clone());
    let mut device = DummyDevice::new();
    manager.update(&mut device, &resource);

    c.bench_function("texture_sync_32x32_region", |b| {
        b.iter(|| {
            texture.mark_dirty(0, 0, ImageRegion::new_2d(64, 64, 32, 32));
            black_box(manager.update(&mut device, &resource));
            device.clear_calls();
        });
    });
}

criterion_group!(
    benches,
    bench_change_queue_record,
    bench_change_queue_drain,
    bench_buffer_incremental_sync,
    bench_texture_region_sync,
);
criterion_main!(benches);
