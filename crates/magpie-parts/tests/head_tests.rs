//! 头部构造与相机注入测试

use magpie_bus::mock::MockTransport;
use magpie_bus::DirectBackend;
use magpie_parts::{Frame, FrameSource, Head, HeadOptions, PartError, zero_store};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

struct FakeCamera {
    closed: Arc<AtomicBool>,
}

impl FrameSource for FakeCamera {
    fn read(&mut self) -> Result<Frame, PartError> {
        Ok(Frame {
            width: 4,
            height: 2,
            data: vec![0u8; 4 * 2 * 3],
        })
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[test]
fn test_hardware_zero_seeding() {
    let dir = tempfile::tempdir().unwrap();
    let zero_path = dir.path().join("neck_zero.bin");
    zero_store::write_hardware_zero(&zero_path, &[210.0, -35.5, 99.0]).unwrap();

    let (transport, bus) = MockTransport::head("head_zero");
    bus.set_position("disk_bottom", 210.0);
    bus.set_position("disk_middle", -35.5);
    bus.set_position("disk_top", 99.0);
    let backend = DirectBackend::open(Box::new(transport));

    let head = Head::with_options(
        backend,
        HeadOptions {
            hardware_zero: Some(zero_path),
            ..HeadOptions::default()
        },
    )
    .unwrap();

    // 上电位置恰好是标定零点：本地读数应为 0
    for disk in head.neck().disks().iter() {
        assert!(disk.position().abs() < 1e-9, "{:?}", disk);
    }

    head.teardown();
}

#[test]
fn test_corrupt_zero_file_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let zero_path = dir.path().join("neck_zero.bin");
    std::fs::write(&zero_path, b"garbage").unwrap();

    let (transport, _bus) = MockTransport::head("head_bad_zero");
    let backend = DirectBackend::open(Box::new(transport));

    let err = Head::with_options(
        backend,
        HeadOptions {
            hardware_zero: Some(zero_path),
            ..HeadOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, PartError::ZeroFile { .. }));
}

#[test]
fn test_camera_injection_and_teardown() {
    let closed = Arc::new(AtomicBool::new(false));
    let (transport, bus) = MockTransport::head("head_cam");
    let backend = DirectBackend::open(Box::new(transport));

    let head = Head::with_options(
        backend,
        HeadOptions {
            camera: Some(Box::new(FakeCamera {
                closed: closed.clone(),
            })),
            ..HeadOptions::default()
        },
    )
    .unwrap();

    let frame = head.get_image().unwrap();
    assert_eq!((frame.width, frame.height), (4, 2));

    head.teardown();
    assert!(closed.load(Ordering::Acquire), "camera must be closed first");
    assert!(bus.is_closed(), "backend must be closed on teardown");

    // 拆除后再取图：相机已经被释放
    assert!(matches!(head.get_image(), Err(PartError::NoCamera)));
}

#[test]
fn test_look_at_moves_neck_disks() {
    let (transport, _bus) = MockTransport::head("head_look");
    let backend = DirectBackend::open(Box::new(transport));
    let head = Head::with_options(backend, HeadOptions::default()).unwrap();

    head.look_at(1.0, 0.3, -0.2, Duration::from_millis(30), true);

    // 三盘目标不再全为初始值
    let moved = head
        .neck()
        .disks()
        .iter()
        .any(|d| d.target_position().abs() > 1e-6);
    assert!(moved, "look_at should command the neck disks");

    head.teardown();
}
