use crate::app::App;
use anyhow::Result;
use lazyreview_core::service::stats::collect_stats;

pub fn run(app: &App) -> Result<()> {
    let handle = app.open_store()?;
    let store = handle.store();
    let stats = collect_stats(&*store, &app.config, app.today)?;

    let documents = stats.notes + stats.without_metadata;
    let share = if documents == 0 {
        0.0
    } else {
        stats.notes as f64 / documents as f64 * 100.0
    };
    println!("Notes: {documents}");
    println!("  with metadata: {} ({share:.1}%)", stats.notes);
    println!("  with review_count: {}", stats.with_review_count);
    if stats.skipped > 0 {
        println!("  unreadable: {}", stats.skipped);
    }
    println!("Total reviews: {}", stats.total_reviews);
    println!("Average mastery: {:.1}%", stats.average_mastery * 100.0);

    println!("\nDue");
    println!("  overdue: {}", stats.due.overdue);
    println!("  today: {}", stats.due.today);
    println!("  this week: {}", stats.due.this_week);
    println!("  upcoming: {}", stats.due.upcoming);
    println!("  never scheduled: {}", stats.due.unscheduled);

    println!("\nDifficulty");
    for (difficulty, count) in &stats.by_difficulty {
        let label = difficulty.map_or("unset", |difficulty| difficulty.as_str());
        println!("  {label}: {count}");
    }

    println!("\nTopics");
    for (topic, topic_stats) in &stats.by_topic {
        println!(
            "  {topic}: {} notes, {} reviews, {:.1}% mastery",
            topic_stats.notes,
            topic_stats.total_reviews,
            topic_stats.average_mastery * 100.0
        );
    }
    Ok(())
}
