//! # xtask
//!
//! clip 工作区的本地门禁。
//!
//! - `check-all`：格式、lint、全部测试，提交前运行
//! - `cov-runtime` / `cov-workspace`：覆盖率报告（需要 cargo-llvm-cov）
//! - `bank-check`：逐个播放内置效果，确认效果库与内置枚举一致

use std::process::{Command, ExitCode};

use clip_runtime::{
    BuiltinEffect, ClipFactory, ClipStatus, ConnectorEntranceEffect, ConnectorExitEffect,
    ConnectorSetterEffect, EffectArgs, EffectCategory, EmphasisEffect, EntranceEffect, ExitEffect,
    MemoryElement, MotionEffect, ScrollEffect, TransitionEffect, Visibility,
};

/// 往返播放时每帧的时间
const FRAME_DT: f32 = 1.0 / 60.0;
/// 单次播放的最大帧数
const MAX_FRAMES: usize = 10_000;

/// 运行一条 cargo 命令，失败时带上命令行返回错误
fn cargo(args: &[&str]) -> anyhow::Result<()> {
    let line = format!("cargo {}", args.join(" "));
    eprintln!("\n==> {line}");
    let status = Command::new("cargo").args(args).status()?;
    anyhow::ensure!(status.success(), "`{line}` 退出状态 {status}");
    Ok(())
}

/// 生成 HTML 覆盖率报告，`scope` 为包选择参数
fn coverage(scope: &[&str]) -> anyhow::Result<()> {
    let available = Command::new("cargo")
        .args(["llvm-cov", "--version"])
        .status()
        .is_ok_and(|s| s.success());
    anyhow::ensure!(
        available,
        "找不到 cargo-llvm-cov；提示：执行 `cargo install cargo-llvm-cov` \
         与 `rustup component add llvm-tools-preview` 后重试"
    );

    let mut args = vec!["llvm-cov"];
    args.extend_from_slice(scope);
    args.extend(["--all-features", "--html"]);
    cargo(&args)?;
    eprintln!("\n报告位置：target/llvm-cov/html/index.html");
    Ok(())
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("xtask: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> anyhow::Result<()> {
    let command = std::env::args().nth(1);
    match command.as_deref().unwrap_or("help") {
        "check-all" => {
            cargo(&["fmt", "--all", "--", "--check"])?;
            cargo(&["clippy", "--workspace", "--all-targets"])?;
            cargo(&["test", "--workspace"])?;
        }
        "cov-runtime" => coverage(&["-p", "clip-runtime"])?,
        // xtask 自身不计入覆盖率
        "cov-workspace" => coverage(&["--workspace", "--exclude", "xtask"])?,
        "bank-check" => bank_check()?,
        "help" | "-h" | "--help" => print_help(),
        other => anyhow::bail!("未知命令 `{other}`；提示：运行 `cargo xtask help` 查看可用命令"),
    }
    Ok(())
}

fn print_help() {
    eprintln!(
        r#"cargo xtask <command>

  check-all       cargo fmt --check、clippy、test（整个 workspace）
  cov-runtime     clip-runtime 的覆盖率报告
  cov-workspace   除 xtask 外所有成员的覆盖率报告
  bank-check      在内存元素上逐个 play → rewind 内置效果，
                  并确认效果库中没有枚举未声明的名称

每个命令在 .cargo/config.toml 中都有同名别名，例如 `cargo bank-check`。"#
    );
}

//=============================================================================
// bank-check 命令实现
//=============================================================================

/// 检查结果
#[derive(Default)]
struct BankCheckResult {
    checked: usize,
    /// (类别, 名称, 问题描述)
    problems: Vec<(EffectCategory, String, String)>,
}

fn bank_check() -> anyhow::Result<()> {
    let factory = ClipFactory::builtin();
    let mut result = BankCheckResult::default();

    check_builtin::<EntranceEffect>(&factory, &mut result);
    check_builtin::<ExitEffect>(&factory, &mut result);
    check_builtin::<EmphasisEffect>(&factory, &mut result);
    check_builtin::<MotionEffect>(&factory, &mut result);
    check_builtin::<TransitionEffect>(&factory, &mut result);
    check_builtin::<ConnectorSetterEffect>(&factory, &mut result);
    check_builtin::<ConnectorEntranceEffect>(&factory, &mut result);
    check_builtin::<ConnectorExitEffect>(&factory, &mut result);
    check_builtin::<ScrollEffect>(&factory, &mut result);

    if factory.bank().len() != result.checked {
        result.problems.push((
            EffectCategory::Emphasis,
            "*".to_string(),
            format!(
                "效果库中有 {} 个定义，内置枚举只声明了 {} 个",
                factory.bank().len(),
                result.checked
            ),
        ));
    }

    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个内置效果", result.checked);
    for (category, name, problem) in &result.problems {
        eprintln!("[ERROR] {category}:{name}: {problem}");
    }

    if result.problems.is_empty() {
        eprintln!("✅ 检查通过，无错误");
        Ok(())
    } else {
        eprintln!("❌ {} 个错误", result.problems.len());
        anyhow::bail!("内置效果库检查发现错误")
    }
}

fn check_builtin<E: BuiltinEffect>(factory: &ClipFactory, result: &mut BankCheckResult) {
    for &effect in E::all() {
        let name = effect.as_str();
        result.checked += 1;
        if !factory.bank().contains(E::CATEGORY, name) {
            result
                .problems
                .push((E::CATEGORY, name.to_string(), "未登记".to_string()));
            continue;
        }
        if let Err(problem) = round_trip(factory, E::CATEGORY, name) {
            result.problems.push((E::CATEGORY, name.to_string(), problem));
        }
    }
}

/// 在内存元素上完成一次 play → rewind
fn round_trip(factory: &ClipFactory, category: EffectCategory, name: &str) -> Result<(), String> {
    let visibility = match category {
        EffectCategory::Entrance | EffectCategory::ConnectorEntrance => Visibility::Unrendered,
        _ => Visibility::Visible,
    };
    let element = MemoryElement::new("probe")
        .with_property("opacity", 1.0)
        .with_visibility(visibility);
    // 第一个位置参数覆盖所有必填数字参数（fade-to 的 opacity、scroll-to 的 top）
    let args = EffectArgs::new().push(0.5);

    let mut clip = factory
        .create(category, element.handle(), name, args, None)
        .map_err(|e| e.to_string())?;

    let done = clip.play().map_err(|e| e.to_string())?;
    settle(&mut clip)?;
    if let Some(err) = done.error() {
        return Err(format!("play 失败: {err}"));
    }

    let done = clip.rewind().map_err(|e| e.to_string())?;
    settle(&mut clip)?;
    if let Some(err) = done.error() {
        return Err(format!("rewind 失败: {err}"));
    }
    if clip.status() != ClipStatus::FinishedBackward {
        return Err(format!("往返后状态为 {}", clip.status()));
    }
    Ok(())
}

fn settle(clip: &mut clip_runtime::Clip) -> Result<(), String> {
    for _ in 0..MAX_FRAMES {
        clip.update(FRAME_DT);
        if !clip.status().is_running() || clip.is_faulted() {
            return Ok(());
        }
    }
    Err(format!("{MAX_FRAMES} 帧内没有结束"))
}
