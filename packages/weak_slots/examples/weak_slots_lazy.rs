//! Lazy compaction: reclaimed slots stay behind as tombstones until a compaction pass.

use weak_slots::{Compaction, Tracked, WeakSlotArray};

fn main() {
    let mut array = WeakSlotArray::<u32>::builder()
        .compaction(Compaction::Lazy)
        .capacity(8)
        .build()
        .expect("a small capacity hint is always valid");

    let mut owners: Vec<_> = (0..8).map(Tracked::new).collect();
    array.extend(&owners);

    // Release every other element.
    owners.retain(|owner| **owner % 2 == 0);

    println!(
        "{} live elements in {} slots before compaction",
        array.len(),
        array.slot_count()
    );

    let removed = array.compact();

    println!(
        "Compaction removed {removed} tombstones, leaving {} slots",
        array.slot_count()
    );

    let values: Vec<u32> = array.iter().map(|item| *item).collect();
    println!("Remaining values: {values:?}");
}
