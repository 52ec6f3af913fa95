use std::time::Duration;

use crate::browser::ScrollablePage;

/// Drive an infinite-scroll listing until the number of nodes matching
/// `item_selector` stops growing, then return that final count.
///
/// The site exposes no total-count signal, so the termination predicate
/// is one full scroll-settle-recount cycle that loads nothing new.
/// `max_attempts` bounds the worst case against a list that never
/// stabilizes; hitting the cap returns the last observed count rather
/// than failing. Transient count/scroll errors end the loop early with
/// the last observed count — scrolling is best-effort and never
/// propagates an error to the caller.
pub async fn stabilize<P: ScrollablePage>(
    page: &P,
    item_selector: &str,
    max_attempts: u32,
    settle_delay: Duration,
) -> usize {
    let mut previous_count = 0usize;
    let mut attempts = 0u32;

    while attempts < max_attempts {
        let current_count = match page.item_count(item_selector).await {
            Ok(count) => count,
            Err(e) => {
                log::warn!("Error counting items during scroll: {}", e);
                break;
            }
        };

        if attempts > 0 && current_count == previous_count {
            log::info!(
                "No new items loaded, stopping scroll. Total items: {}",
                current_count
            );
            return current_count;
        }

        previous_count = current_count;

        if let Err(e) = page.scroll_to_bottom().await {
            log::warn!("Error during scrolling: {}", e);
            break;
        }
        tokio::time::sleep(settle_delay).await;

        attempts += 1;
        log::info!("Scroll attempt {}, items loaded: {}", attempts, current_count);
    }

    previous_count
}
