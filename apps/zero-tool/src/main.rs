//! # magpie-zero
//!
//! 离线零点标定工具：把轨道颈部三只盘停在机械零位，
//! 读出各盘的原始读数并写入硬件零点文件。
//! 该文件随后在头部部件构造时读回，用于预置盘零点。
//!
//! ```bash
//! # 读取硬件并写零点文件
//! magpie-zero --port /dev/ttyUSB0 --output magpie_hardware_zero.bin
//!
//! # 无硬件演示（mock 总线）
//! magpie-zero --mock
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use magpie_bus::mock::MockTransport;
use magpie_bus::{BusError, BusTransport, IoBackend, SharedBus};
use magpie_parts::zero_store;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Magpie 轨道颈部零点标定工具
#[derive(Parser, Debug)]
#[command(name = "magpie-zero")]
#[command(about = "Capture the orbital neck hardware zero reference", long_about = None)]
#[command(version)]
struct Cli {
    /// 轨道关节所在的总线端口
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// 零点文件输出路径
    #[arg(long, default_value = "magpie_hardware_zero.bin")]
    output: PathBuf,

    /// 使用 mock 总线（无硬件演示/联调）
    #[arg(long)]
    mock: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let backend = SharedBus::open_with(&cli.port, |port| {
        if cli.mock {
            let (transport, bus) = MockTransport::head(port);
            // 演示值：盘停在任意上电位置
            bus.set_position("disk_bottom", 210.0);
            bus.set_position("disk_middle", -35.5);
            bus.set_position("disk_top", 99.0);
            Ok(Box::new(transport) as Box<dyn BusTransport>)
        } else {
            // 硬件传输由厂商总线 crate 提供，本工具不内置线缆协议
            Err(BusError::TransportUnavailable {
                port: port.to_string(),
                reason: "no hardware transport compiled into this build (use --mock)".into(),
            })
        }
    })
    .with_context(|| format!("failed to open bus on `{}`", cli.port))?;

    {
        let backend = backend.clone();
        ctrlc::set_handler(move || {
            info!("interrupted, closing bus");
            backend.close();
            std::process::exit(130);
        })
        .context("failed to install ctrl-c handler")?;
    }

    // 等一轮模块同步完成
    std::thread::sleep(Duration::from_millis(500));

    let disks = backend
        .resolve_disks()
        .context("orbital disks not found on this bus")?;
    let hardware_zero = [
        disks.bottom.raw_position(),
        disks.middle.raw_position(),
        disks.top.raw_position(),
    ];

    zero_store::write_hardware_zero(&cli.output, &hardware_zero)
        .with_context(|| format!("failed to write `{}`", cli.output.display()))?;

    println!(
        "hardware zero [bottom, middle, top] = [{:.3}, {:.3}, {:.3}] -> {}",
        hardware_zero[0],
        hardware_zero[1],
        hardware_zero[2],
        cli.output.display()
    );

    backend.close();
    Ok(())
}
