use crate::runner::{run_tests, Palette, RunnerOptions};
use crate::watcher::FileWatcher;
use std::path::PathBuf;

fn clear_screen(palette: &Palette) {
    if palette.enabled() {
        print!("\x1B[2J\x1B[1;1H");
    }
}

/// Re-runs the whole harness whenever a test file under the root changes.
/// Runs never overlap: batches arriving mid-run are queued by the watcher
/// channel and coalesced into the next run.
pub async fn run_watch_mode(root: PathBuf, options: RunnerOptions) -> anyhow::Result<()> {
    let palette = Palette::new(options.color);
    let watcher = FileWatcher::new(&root, 500)?;
    let tag = palette.accent("[watch]");

    clear_screen(&palette);
    println!("{} Running initial tests...\n", tag);
    let _ = run_tests(root.clone(), options.clone()).await;
    println!(
        "\n{} Watching {} for changes. Press Ctrl+C to stop.\n",
        tag,
        root.display()
    );

    while let Some(mut changed) = watcher.recv() {
        while let Some(more) = watcher.try_recv() {
            changed.extend(more);
        }
        changed.sort();
        changed.dedup();

        clear_screen(&palette);
        let names: Vec<String> = changed.iter().map(|p| p.display().to_string()).collect();
        println!("{} Change detected: {}\n", tag, names.join(", "));

        let _ = run_tests(root.clone(), options.clone()).await;
        println!(
            "\n{} Watching {} for changes. Press Ctrl+C to stop.\n",
            tag,
            root.display()
        );
    }

    Ok(())
}
