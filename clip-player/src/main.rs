//! # Clip Player
//!
//! 无界面 clip 播放器：在内存元素上创建并播放一个效果，
//! 按固定帧率推进，每帧向 stdout 输出一行 JSON。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p clip-player -- --category entrance --effect fade-in
//! cargo run -p clip-player -- --category motion --effect translate --arg 120 --arg y=40 --rewind
//! cargo run -p clip-player -- --category transition --effect fade-to --arg 0.3 --set opacity=1 --fps 10
//! cargo run -p clip-player -- --category emphasis --effect pulse --config clip.json --verbose
//! cargo run -p clip-player -- list
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use clip_runtime::{
    Clip, ClipConfigPartial, ClipEvent, ClipFactory, Direction, Easing, EffectArg, EffectArgs,
    EffectCategory, MemoryElement, Visibility, VisualElement,
};
use serde_json::{Value, json};

/// 单次播放的最大帧数，防止等待中的 clip 无限循环
const MAX_FRAMES: usize = 100_000;

#[derive(Parser)]
#[command(name = "clip-player")]
#[command(about = "无界面 clip 播放器 - 逐帧输出元素属性")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// 效果类别（entrance、exit、emphasis、motion 等）
    #[arg(short, long, value_parser = parse_category, default_value = "emphasis")]
    category: EffectCategory,

    /// 效果名称
    #[arg(short, long, default_value = "pulse")]
    effect: String,

    /// 效果参数：`value` 为位置参数，`key=value` 为命名参数
    #[arg(short = 'a', long = "arg", value_name = "ARG")]
    args: Vec<String>,

    /// 元素初始属性：`name=value`
    #[arg(short = 's', long = "set", value_name = "PROP=VALUE", value_parser = parse_property)]
    properties: Vec<(String, f32)>,

    /// 元素初始可见性（auto：entrance 类别从隐藏开始）
    #[arg(long, value_enum, default_value_t = StartVisibility::Auto)]
    visibility: StartVisibility,

    /// 配置文件（JSON，字段同 ClipConfig）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 活跃阶段时长（秒）
    #[arg(long)]
    duration: Option<f32>,

    /// 开始前延迟（秒）
    #[arg(long)]
    delay: Option<f32>,

    /// 结束后延迟（秒）
    #[arg(long)]
    end_delay: Option<f32>,

    /// 缓动函数，如 ease-in-out、cubic-bezier(0.4, 0, 0.2, 1)
    #[arg(long, value_parser = parse_easing)]
    easing: Option<Easing>,

    /// 帧率
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// 正向播放结束后再反向播放一次
    #[arg(short, long)]
    rewind: bool,

    /// 输出调试日志（stderr）
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出内置效果
    List,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StartVisibility {
    Auto,
    Visible,
    Invisible,
    Unrendered,
}

fn parse_category(s: &str) -> Result<EffectCategory, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_easing(s: &str) -> Result<Easing, String> {
    s.parse().map_err(|e| format!("{e}"))
}

fn parse_property(s: &str) -> Result<(String, f32), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}' 缺少 '='；提示：格式为 name=value"))?;
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("属性 '{name}' 的值 '{value}' 不是数字"))?;
    Ok((name.trim().to_string(), value))
}

fn parse_effect_args(raw: &[String]) -> EffectArgs {
    raw.iter().fold(EffectArgs::new(), |args, item| match item.split_once('=') {
        Some((key, value)) => args.named(key.trim(), EffectArg::infer(value.trim())),
        None => args.push(EffectArg::infer(item.trim())),
    })
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = real_main(&cli) {
        eprintln!("clip-player error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main(cli: &Cli) -> anyhow::Result<()> {
    let factory = ClipFactory::builtin();

    if let Some(Commands::List) = cli.command {
        list_effects(&factory);
        return Ok(());
    }

    let overrides = load_overrides(cli)?;
    let element = build_element(cli);
    let args = parse_effect_args(&cli.args);

    let mut clip = factory
        .create(cli.category, element.handle(), &cli.effect, args, Some(&overrides))
        .with_context(|| format!("无法创建 {}:{}", cli.category, cli.effect))?;
    tracing::info!(label = %clip.label(), config = ?clip.config(), "clip 已创建");

    let dt = 1.0 / cli.fps.max(1) as f32;
    clip.play().context("play() 失败")?;
    drive(&mut clip, &element, Direction::Forward, dt)?;

    if cli.rewind {
        clip.rewind().context("rewind() 失败")?;
        drive(&mut clip, &element, Direction::Backward, dt)?;
    }
    Ok(())
}

fn list_effects(factory: &ClipFactory) {
    for category in EffectCategory::ALL {
        let names = factory.bank().names(category);
        println!("{category}: {}", names.join(", "));
    }
}

/// 合并配置：配置文件在下，命令行选项在上
fn load_overrides(cli: &Cli) -> anyhow::Result<ClipConfigPartial> {
    let file = match &cli.config {
        Some(path) => read_config(path)?,
        None => ClipConfigPartial::new(),
    };

    let mut flags = ClipConfigPartial::new();
    if let Some(v) = cli.duration {
        flags = flags.duration(v);
    }
    if let Some(v) = cli.delay {
        flags = flags.delay(v);
    }
    if let Some(v) = cli.end_delay {
        flags = flags.end_delay(v);
    }
    if let Some(v) = cli.easing {
        flags = flags.easing(v);
    }
    Ok(file.merge(&flags))
}

fn read_config(path: &Path) -> anyhow::Result<ClipConfigPartial> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("无法读取配置文件 {}", path.display()))?;
    let config = ClipConfigPartial::from_json(&text)
        .with_context(|| format!("配置文件 {} 无效", path.display()))?;
    Ok(config)
}

fn build_element(cli: &Cli) -> MemoryElement {
    let visibility = match cli.visibility {
        StartVisibility::Visible => Visibility::Visible,
        StartVisibility::Invisible => Visibility::Invisible,
        StartVisibility::Unrendered => Visibility::Unrendered,
        StartVisibility::Auto => match cli.category {
            EffectCategory::Entrance | EffectCategory::ConnectorEntrance => Visibility::Unrendered,
            _ => Visibility::Visible,
        },
    };
    cli.properties
        .iter()
        .fold(MemoryElement::new("element"), |element, (name, value)| {
            element.with_property(name.clone(), *value)
        })
        .with_visibility(visibility)
}

/// 推进到本次播放结束，每帧输出一行
fn drive(clip: &mut Clip, element: &MemoryElement, direction: Direction, dt: f32) -> anyhow::Result<()> {
    let mut time = 0.0_f32;
    for frame in 0..MAX_FRAMES {
        let events = clip.update(dt);
        time += dt;

        if let Some(ClipEvent::Faulted(err)) = events.iter().find(|e| matches!(e, ClipEvent::Faulted(_))) {
            anyhow::bail!("{direction} 播放中止: {err}");
        }

        let snapshot = clip.snapshot();
        let line = json!({
            "direction": direction.as_str(),
            "frame": frame,
            "time": time,
            "status": snapshot.status.as_str(),
            "phase": snapshot.phase.map(|p| p.as_str()),
            "progress": snapshot.phase_progress,
            "position": snapshot.position.map(|c| c.to_string()),
            "visibility": element.visibility().as_str(),
            "properties": element.properties(),
            "events": events.iter().map(describe).collect::<Vec<Value>>(),
        });
        println!("{line}");

        if !snapshot.status.is_running() {
            return Ok(());
        }
    }
    anyhow::bail!("{direction} 播放在 {MAX_FRAMES} 帧内没有结束")
}

fn describe(event: &ClipEvent) -> Value {
    match event {
        ClipEvent::PassStarted(d) => json!({ "type": "pass-started", "direction": d.as_str() }),
        ClipEvent::PhaseEntered { phase, .. } => json!({ "type": "phase-entered", "phase": phase.as_str() }),
        ClipEvent::TaskFired { coordinate, .. } => {
            json!({ "type": "task-fired", "at": coordinate.to_string() })
        }
        ClipEvent::PromiseResolved { coordinate, .. } => {
            json!({ "type": "promise-resolved", "at": coordinate.to_string() })
        }
        ClipEvent::Suspended { coordinate, .. } => {
            json!({ "type": "suspended", "at": coordinate.to_string() })
        }
        ClipEvent::Resumed(_) => json!({ "type": "resumed" }),
        ClipEvent::PassFinished(d) => json!({ "type": "pass-finished", "direction": d.as_str() }),
        ClipEvent::Faulted(err) => json!({ "type": "faulted", "error": err.to_string() }),
    }
}
