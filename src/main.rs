use workpool::{Config, ThreadPoolInner};
use tracing_subscriber::EnvFilter;
use std::time::Instant;


fn main(){
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let now = Instant::now();
    let pool = ThreadPoolInner::with_config(Config::elastic(4, 16))
        .expect("failed to start pool");

    let handles = pool
        .submit_all(|i: u64| i * i, 0..100_000u64)
        .expect("pool rejected submission");

    let mut sum: u64 = 0;
    for handle in handles {
        sum += handle.join().expect("task failed");
    }

    pool.shutdown();
    println!("sum: {} | elapsed: {:?}", sum, now.elapsed());
}
