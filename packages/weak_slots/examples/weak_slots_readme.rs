//! Example that demonstrates the usage shown in the package documentation.
//!
//! * Creating an array.
//! * Adding elements owned elsewhere.
//! * Observing reclamation when an owner lets go.

use weak_slots::{Tracked, WeakSlotArray};

fn main() {
    let mut array = WeakSlotArray::builder()
        .notify_on_reclaim(true)
        .build()
        .expect("default capacity is always valid");

    array.on_reclaim(|index| println!("Slot {index} was reclaimed"));

    let alice = Tracked::new("Alice".to_string());
    let bob = Tracked::new("Bob".to_string());
    let charlie = Tracked::new("Charlie".to_string());

    // The array only holds weak references, the owners live here.
    array.push(&alice);
    array.push(&bob);
    array.push(&charlie);

    println!("Array contains {} elements", array.len());

    // Bob's last owner goes away, so the array reclaims his slot.
    drop(bob);

    for name in &array {
        println!("Still present: {}", *name);
    }

    println!("Array contains {} elements", array.len());
}
