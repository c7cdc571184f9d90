// Example usage of ObjectPool
use mlserve_containers::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Widget {
    id: usize,
}

fn main() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let pool = ObjectPool::new(
        move || Widget {
            id: counter.fetch_add(1, Ordering::SeqCst),
        },
        2,
        3,
    )
    .expect("Should build pool");
    println!("Pre-warmed: {:?}", pool.status());

    let a = pool.acquire().expect("Should take from the bag");
    let b = pool.acquire().expect("Should take from the bag");
    let c = pool.acquire().expect("Should construct a third widget");
    println!("Checked out {:?}, {:?}, {:?}", a, b, c);
    println!("Factory calls: {}", created.load(Ordering::SeqCst));

    // All three are out and max_size is 3
    match pool.acquire() {
        Ok(widget) => println!("ERROR: got {:?} past capacity", widget),
        Err(error) => println!("Correctly refused: {}", error),
    }

    let a_id = a.id;
    pool.release(a);
    let d = pool.acquire().expect("Should reuse the released widget");
    println!(
        "Reused widget {} (was {}), factory calls: {}",
        d.id,
        a_id,
        created.load(Ordering::SeqCst)
    );

    // Guards hand the widget back when they go out of scope
    pool.release(d);
    {
        let guard = pool.get().expect("Should take from the bag");
        println!("Borrowed through guard: {:?}", *guard);
    }
    println!("After guard: {:?}", pool.status());

    pool.release(b);
    pool.release(c);
    let drained = pool.close();
    println!("Closed, drained {} widgets", drained.len());
}
