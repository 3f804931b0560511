//! Terminal front end: parses arguments, runs one generation, renders run
//! snapshots as they arrive and writes the finished panels to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use console::style;
use tokio::sync::RwLock;

use crate::core::comic::{ArtStyle, AudienceMode, Gender, GenerationRequest, ReferenceImage};
use crate::core::gemini::GeminiClient;
use crate::core::orchestrator::{CredentialReselector, GenerationConfig, Orchestrator};
use crate::core::run::{RunPhase, RunState};

fn print_help() {
    println!(
        "\n {} — turn a feeling into a four-panel healing comic\n",
        style("warmtoon").green().bold()
    );
    println!(
        " {} warmtoon \"<your narrative>\" [options]\n",
        style("Usage:").bold()
    );
    println!(" {}", style("Options:").bold());
    println!("   -s, --style <name>    japanese | korean | european | cyberpunk | pixel | animated");
    println!("   -m, --mode <name>     general | kids");
    println!("   -g, --gender <name>   boy | girl | neutral");
    println!("   -p, --photo <path>    reference photo, repeatable");
    println!("   -o, --out <dir>       output directory (default: comic-out)");
    println!(
        "\n The Gemini API key is read from {} or prompted for.\n",
        style("GEMINI_API_KEY").cyan()
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CliOptions {
    pub narrative: String,
    pub style: ArtStyle,
    pub mode: AudienceMode,
    pub gender: Option<Gender>,
    pub photos: Vec<PathBuf>,
    pub out: PathBuf,
}

pub(crate) fn parse_args(args: &[String]) -> Result<CliOptions> {
    let mut narrative: Option<String> = None;
    let mut opts = CliOptions {
        narrative: String::new(),
        style: ArtStyle::Japanese,
        mode: AudienceMode::General,
        gender: None,
        photos: Vec::new(),
        out: PathBuf::from("comic-out"),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--style" | "-s" => {
                let value = flag_value(args, i, "--style")?;
                opts.style = ArtStyle::from_name(value)
                    .with_context(|| format!("unknown style: {value}"))?;
                i += 2;
            }
            "--mode" | "-m" => {
                let value = flag_value(args, i, "--mode")?;
                opts.mode = AudienceMode::from_name(value)
                    .with_context(|| format!("unknown mode: {value}"))?;
                i += 2;
            }
            "--gender" | "-g" => {
                let value = flag_value(args, i, "--gender")?;
                opts.gender = Some(
                    Gender::from_name(value).with_context(|| format!("unknown gender: {value}"))?,
                );
                i += 2;
            }
            "--photo" | "-p" => {
                opts.photos
                    .push(PathBuf::from(flag_value(args, i, "--photo")?));
                i += 2;
            }
            "--out" | "-o" => {
                opts.out = PathBuf::from(flag_value(args, i, "--out")?);
                i += 2;
            }
            flag if flag.starts_with('-') => bail!("unknown flag: {flag}"),
            value => {
                if narrative.is_some() {
                    bail!("only one narrative argument is allowed (quote your text)");
                }
                narrative = Some(value.to_string());
                i += 1;
            }
        }
    }

    opts.narrative = match narrative {
        Some(n) if !n.trim().is_empty() => n,
        _ => bail!("tell me how you feel: warmtoon \"<your narrative>\""),
    };
    Ok(opts)
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str> {
    args.get(i + 1)
        .map(String::as_str)
        .with_context(|| format!("{flag} needs a value"))
}

fn load_reference_images(paths: &[PathBuf]) -> Result<Vec<ReferenceImage>> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let data = std::fs::read(path)
            .with_context(|| format!("could not read photo {}", path.display()))?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        images.push(ReferenceImage {
            mime_type,
            data: data.into(),
        });
    }
    Ok(images)
}

/// Prompts for a replacement API key and swaps it into the shared key slot
/// the client reads from.
struct PromptReselector {
    key: Arc<RwLock<String>>,
}

#[async_trait::async_trait]
impl CredentialReselector for PromptReselector {
    async fn reselect(&self) -> Result<()> {
        let entered = tokio::task::spawn_blocking(|| {
            inquire::Password::new("The service rejected the current API key. Enter a new one:")
                .without_confirmation()
                .prompt()
        })
        .await??;
        *self.key.write().await = entered.trim().to_string();
        Ok(())
    }
}

async fn resolve_api_key() -> Result<String> {
    if let Ok(key) = std::env::var("GEMINI_API_KEY")
        && !key.trim().is_empty()
    {
        return Ok(key.trim().to_string());
    }
    let entered = tokio::task::spawn_blocking(|| {
        inquire::Password::new("Gemini API key:")
            .without_confirmation()
            .prompt()
    })
    .await??;
    Ok(entered.trim().to_string())
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }
    let opts = parse_args(&args)?;
    crate::logging::init();

    let mut request = GenerationRequest::new(opts.narrative.clone(), opts.style, opts.mode);
    request.gender = opts.gender;
    request.reference_images = load_reference_images(&opts.photos)?;

    let key = Arc::new(RwLock::new(resolve_api_key().await?));
    let client = Arc::new(GeminiClient::new(key.clone()));
    let reselector = Arc::new(PromptReselector { key });
    let orchestrator = Orchestrator::new(client, reselector, GenerationConfig::default());

    let rx = orchestrator.subscribe();
    let printer = tokio::spawn(render_progress(rx));

    let final_state = orchestrator.start(request).await?;
    drop(orchestrator); // closes the snapshot channel so the printer exits
    let _ = printer.await;

    match final_state.phase {
        RunPhase::Completed => write_outputs(&final_state, &opts.out),
        RunPhase::Idle => {
            println!(
                "\n {} API key updated — run the same command again to generate your comic.",
                style("✓").green()
            );
            Ok(())
        }
        _ => {
            let error = final_state
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "generation failed".to_string());
            if final_state.completed_count > 0 {
                // Partial results are still worth keeping on failure.
                write_outputs(&final_state, &opts.out)?;
            }
            bail!("{error}");
        }
    }
}

async fn render_progress(mut rx: tokio::sync::watch::Receiver<RunState>) {
    let mut last_phase = rx.borrow().phase;
    let mut last_count = 0usize;
    let mut last_wait: Option<u64> = None;
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.phase != last_phase {
            match state.phase {
                RunPhase::Scripting => {
                    println!(" {} writing your four-panel story...", style("✍").cyan());
                }
                RunPhase::Drawing => {
                    println!(
                        " {} story ready, drawing {} panels...",
                        style("✎").cyan(),
                        state.panels.len()
                    );
                }
                RunPhase::Completed => {
                    println!(" {} all panels drawn", style("✓").green().bold());
                }
                RunPhase::Failed | RunPhase::Idle => {}
            }
            last_phase = state.phase;
        }
        if state.completed_count > last_count {
            for panel in &state.panels[last_count..state.completed_count] {
                println!(
                    "   {} panel {}/{} — {}",
                    style("●").green(),
                    panel.index,
                    state.panels.len(),
                    panel.caption
                );
            }
            last_count = state.completed_count;
        }
        if state.pending_wait_secs != last_wait {
            if let Some(secs) = state.pending_wait_secs {
                println!(
                    "   {} rate limited, retrying in {}s...",
                    style("…").yellow(),
                    secs
                );
            }
            last_wait = state.pending_wait_secs;
        }
    }
}

fn extension_for(mime_type: &str) -> &str {
    match mime_type.rsplit('/').next().unwrap_or("png") {
        "jpeg" => "jpg",
        other if !other.is_empty() => other,
        _ => "png",
    }
}

fn write_outputs(state: &RunState, out: &Path) -> Result<()> {
    std::fs::create_dir_all(out).with_context(|| format!("could not create {}", out.display()))?;
    let mut captions = String::new();
    for panel in &state.panels {
        let Some(image) = &panel.image else { continue };
        let path = out.join(format!(
            "panel-{}.{}",
            panel.index,
            extension_for(&image.mime_type)
        ));
        std::fs::write(&path, &image.data)
            .with_context(|| format!("could not write {}", path.display()))?;
        captions.push_str(&format!("{}. {}\n", panel.index, panel.caption));
        println!(" {} saved {}", style("→").dim(), path.display());
    }
    std::fs::write(out.join("captions.txt"), captions)?;
    println!(
        " {} comic written to {}",
        style("✓").green().bold(),
        out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_args_defaults() {
        let opts = parse_args(&args(&["今天很累"])).unwrap();
        assert_eq!(opts.narrative, "今天很累");
        assert_eq!(opts.style, ArtStyle::Japanese);
        assert_eq!(opts.mode, AudienceMode::General);
        assert_eq!(opts.gender, None);
        assert!(opts.photos.is_empty());
        assert_eq!(opts.out, PathBuf::from("comic-out"));
    }

    #[test]
    fn parse_args_full() {
        let opts = parse_args(&args(&[
            "被雨淋濕了", "--style", "pixel", "-m", "kids", "--gender", "girl", "-p", "me.jpg",
            "--photo", "dog.png", "-o", "strips",
        ]))
        .unwrap();
        assert_eq!(opts.style, ArtStyle::Pixel);
        assert_eq!(opts.mode, AudienceMode::Kids);
        assert_eq!(opts.gender, Some(Gender::Girl));
        assert_eq!(opts.photos.len(), 2);
        assert_eq!(opts.out, PathBuf::from("strips"));
    }

    #[test]
    fn parse_args_rejects_bad_input() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["hi", "--style", "crayon"])).is_err());
        assert!(parse_args(&args(&["hi", "--weird"])).is_err());
        assert!(parse_args(&args(&["hi", "--photo"])).is_err());
        assert!(parse_args(&args(&["one", "two"])).is_err());
    }

    #[test]
    fn extension_for_common_mimes() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for(""), "png");
    }

    #[test]
    fn write_outputs_saves_panels_and_captions() {
        use crate::core::comic::{Panel, PanelImage, PanelScript};
        let dir = tempfile::tempdir().unwrap();
        let mut state = RunState::new_run(ArtStyle::Japanese);
        let mut panel = Panel::from_script(PanelScript {
            index: 1,
            description: "scene".into(),
            caption: "辛苦了".into(),
        });
        panel.image = Some(PanelImage {
            mime_type: "image/png".into(),
            data: Bytes::from_static(b"png-bytes"),
        });
        state.panels = vec![panel];
        state.sync_completed_count();

        write_outputs(&state, dir.path()).unwrap();
        assert!(dir.path().join("panel-1.png").exists());
        let captions = std::fs::read_to_string(dir.path().join("captions.txt")).unwrap();
        assert!(captions.contains("辛苦了"));
    }
}
