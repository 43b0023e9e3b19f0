//! spec.md §8 S4: map-write → submit → map-read ordering. A buffer
//! written on the host, copied to a second buffer on the device, must
//! read back correctly once its submission's fence is known finished —
//! exercising Invariant 2 (`latest_fence` gating a map) end to end.

use gfx_core::buffer::BufferDescriptor;
use types::{BufferUsage, MapMode};

#[test]
fn map_write_then_submit_then_map_read_returns_written_bytes() {
    tests::skip_without_device!(device);
    let queue = device.queue();

    let src = device
        .create_buffer(&BufferDescriptor {
            label: None,
            size: 64,
            usage: BufferUsage::MAP_WRITE | BufferUsage::COPY_SRC,
            mapped_at_creation: true,
        })
        .expect("create src buffer");
    {
        let mut buf = src.borrow_mut();
        let ptr = buf.map(&device, MapMode::Write).expect("map src");
        unsafe { std::ptr::write_bytes(ptr, 0xAA, 64) };
        buf.unmap(&device);
    }

    let dst = device
        .create_buffer(&BufferDescriptor {
            label: None,
            size: 64,
            usage: BufferUsage::COPY_DST | BufferUsage::MAP_READ,
            mapped_at_creation: false,
        })
        .expect("create dst buffer");

    let mut encoder = device.create_command_encoder().expect("create encoder");
    encoder.copy_buffer_to_buffer(&src, 0, &dst, 0, 64);
    let cmd = encoder.finish().expect("finish encoder");
    let fence = queue.submit(vec![cmd], None).expect("submit");

    device.fences().wait(device.raw(), fence, u64::MAX).expect("wait for submit");

    let mut buf = dst.borrow_mut();
    let ptr = buf.map(&device, MapMode::Read).expect("map dst");
    let bytes = unsafe { std::slice::from_raw_parts(ptr, 64) };
    assert!(bytes.iter().all(|&b| b == 0xAA));
    buf.unmap(&device);
}
