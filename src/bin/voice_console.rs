// src/bin/voice_console.rs
//
// Feed transcripts on stdin through the engine and watch the report change.
// Lines starting with ':' are console commands (:doc, :state, :help, :1..:9 to
// apply a lookup candidate, :quit).

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use laudo_voice::{
    CandidateKind, EngineCallbacks, EngineSettings, InMemoryCatalog, LookupCandidate,
    MemoryDocument, UtteranceOutcome, VoiceCommandEngine,
};

fn sample_catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::default();
    catalog.add(
        LookupCandidate::new(
            "tc_torax",
            CandidateKind::Template,
            "TC de Tórax",
            "TOMOGRAFIA COMPUTADORIZADA DO TÓRAX\n\nTécnica: [técnica]\n\nAchados: [achados]\n\nImpressão: [impressão]",
        )
        .with_modality("TC")
        .with_region("tórax")
        .with_variant(
            "com contraste",
            "TOMOGRAFIA COMPUTADORIZADA DO TÓRAX COM CONTRASTE\n\nTécnica: [técnica]\n\nAchados: [achados]\n\nImpressão: [impressão]",
        ),
    );
    catalog.add(
        LookupCandidate::new(
            "us_abdome",
            CandidateKind::Template,
            "US de Abdome Total",
            "ULTRASSONOGRAFIA DE ABDOME TOTAL\n\nAchados: [achados]\n\nImpressão: [impressão]",
        )
        .with_modality("US")
        .with_region("abdome"),
    );
    catalog.add(LookupCandidate::new(
        "frase_normal",
        CandidateKind::Frase,
        "Exame normal",
        "Exame dentro dos limites da normalidade.",
    ));
    catalog.add(
        LookupCandidate::new(
            "frase_cisto",
            CandidateKind::Frase,
            "Cisto simples",
            "Imagem cística simples, sem septações ou componentes sólidos.",
        )
        .with_category("abdome")
        .with_tags(["renal", "hepático"]),
    );
    catalog
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = EngineSettings::load();
    let callbacks = EngineCallbacks::new()
        .on_reject(|transcript, candidate| match candidate {
            Some(c) => println!("  (rejected '{}' -> {} score {:.3})", transcript, c.command.id, c.score),
            None => println!("  (no command for '{}')", transcript),
        })
        .on_error(|e| eprintln!("  [error] {}", e));

    let mut engine = VoiceCommandEngine::from_settings(settings, callbacks);
    engine.attach_editor(Box::new(MemoryDocument::new()));
    engine.set_catalog_search(Arc::new(sample_catalog()));
    if !engine.load_commands() {
        eprintln!("Could not load the command catalog");
        return Ok(());
    }
    engine.start();

    println!("{} commands loaded. Dictate, or :help for console commands.", engine.commands().len());

    let mut candidates: Vec<LookupCandidate> = Vec::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();

        if let Some(console_cmd) = input.strip_prefix(':') {
            match console_cmd {
                "quit" | "q" => break,
                "doc" => println!("---\n{}\n---", engine.editor().map(|e| e.plain_text()).unwrap_or_default()),
                "state" => println!("{:#?}", engine.state()),
                "help" => println!("{}", engine.help_text()),
                n => match n.parse::<usize>().ok().and_then(|i| candidates.get(i.wrapping_sub(1))) {
                    Some(candidate) => {
                        let result = engine.apply_candidate(candidate, None);
                        println!("  applied '{}': {}", candidate.title, result.success);
                    }
                    None => println!("  unknown console command ':{}'", n),
                },
            }
            continue;
        }

        match engine.handle_utterance(input).await {
            UtteranceOutcome::Ignored => {}
            UtteranceOutcome::Lookup { intent, candidates: found } => {
                println!("  {:?} search '{}': {} result(s)", intent.intent_type, intent.query, found.len());
                for (i, c) in found.iter().enumerate() {
                    println!("  :{} {} (score {:.2})", i + 1, c.title, c.score);
                }
                candidates = found;
            }
            UtteranceOutcome::Executed { command_match, result } => {
                println!(
                    "  command '{}' via '{}' -> {}",
                    command_match.command.name,
                    command_match.matched_phrase,
                    if result.success { "ok" } else { "failed" }
                );
                if let Some(message) = result.message {
                    println!("{}", message);
                }
            }
            UtteranceOutcome::Dictated { result } => {
                if !result.success {
                    println!("  dictation not inserted: {}", result.message.unwrap_or_default());
                }
            }
        }

        println!("> {}", engine.editor().map(|e| e.plain_text()).unwrap_or_default().replace('\n', "⏎"));
        stdout.flush()?;
    }

    engine.stop();
    if let Some(document) = engine.detach_editor() {
        println!("Final report:\n{}", document.plain_text());
    }
    Ok(())
}
