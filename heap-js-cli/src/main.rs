use clap::Parser;
use clap::Subcommand;
use heap_js::AllocError;
use heap_js::Arena;
use heap_js::ChainSearch;
use heap_js::Handle;
use heap_js::Heap;
use heap_js::HeapConfig;
use heap_js::HeapError;
use heap_js::Value;
use heap_js::NULL_HANDLE;
use heap_js::OBJECT_SHAPE;
use heap_js::SHAPE_PROTO;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Exercise the heap-js arena and handle table", long_about = None)]
struct Args {
  /// Enable pretty tracing output to stderr.
  #[arg(long, global = true)]
  trace: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Reserve blocks from one arena on many threads and check that none overlap.
  Stress {
    #[arg(long, default_value_t = 8)]
    threads: usize,
    /// Reservations per thread.
    #[arg(long, default_value_t = 10_000)]
    allocs: usize,
    /// Bytes per reservation.
    #[arg(long, default_value_t = 48)]
    size: usize,
    /// Arena capacity; defaults to exactly enough for every reservation.
    #[arg(long)]
    capacity: Option<usize>,
  },
  /// Build a prototype chain and search it from the leaf for the root.
  Chain {
    #[arg(long, default_value_t = 100)]
    depth: usize,
    /// Point the root back at the leaf, making the chain cyclic.
    #[arg(long)]
    cycle: bool,
  },
  /// Build a small object graph and print heap statistics.
  Stats {
    /// JSON heap configuration; missing keys take their defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
  },
}

#[derive(Serialize)]
struct StressReport {
  threads: usize,
  allocs_per_thread: usize,
  size: usize,
  succeeded: usize,
  failed: usize,
  overlapping: usize,
  arena_used: usize,
  arena_capacity: usize,
}

#[derive(Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum ChainOutcome {
  Found { hops: usize },
  NotFound { visited: usize },
  DepthExceeded { visited: usize },
}

#[derive(Serialize)]
struct ChainReport {
  depth: usize,
  cycle: bool,
  #[serde(flatten)]
  outcome: ChainOutcome,
}

fn install_subscriber(trace: bool) {
  if !trace {
    return;
  }

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  fmt().with_env_filter(filter).pretty().init();
}

fn stress(
  threads: usize,
  allocs: usize,
  size: usize,
  capacity: Option<usize>,
) -> Result<StressReport, Box<dyn Error>> {
  let capacity = match capacity {
    Some(capacity) => capacity,
    None => size
      .checked_next_multiple_of(heap_js::ALIGNMENT)
      .and_then(|aligned| aligned.checked_mul(allocs))
      .and_then(|per_thread| per_thread.checked_mul(threads))
      .ok_or("stress arena capacity overflows usize; pass --capacity")?,
  };
  let arena = Arena::new(capacity)?;
  let shared = &arena;

  let results: Vec<Vec<Result<heap_js::ArenaPtr, AllocError>>> = std::thread::scope(|s| {
    let workers: Vec<_> = (0..threads)
      .map(|_| {
        s.spawn(move || {
          (0..allocs)
            .map(|_| shared.allocate(size))
            .collect::<Vec<_>>()
        })
      })
      .collect();
    workers
      .into_iter()
      .map(|w| w.join())
      .collect::<Result<Vec<_>, _>>()
  })
  .map_err(|_| "stress worker panicked")?;

  let mut ranges = Vec::new();
  let mut failed = 0;
  for result in results.into_iter().flatten() {
    match result {
      Ok(ptr) => ranges.push(ptr.reserved_range()),
      Err(_) => failed += 1,
    }
  }
  ranges.sort_by_key(|r| r.start);
  let overlapping = ranges
    .windows(2)
    .filter(|pair| pair[0].end > pair[1].start)
    .count();

  Ok(StressReport {
    threads,
    allocs_per_thread: allocs,
    size,
    succeeded: ranges.len(),
    failed,
    overlapping,
    arena_used: arena.used(),
    arena_capacity: arena.capacity(),
  })
}

fn chain(depth: usize, cycle: bool) -> Result<ChainReport, HeapError> {
  // Object, shape and property-less records, with room to spare.
  let capacity = (depth.max(1) * 128).max(64 * 1024);
  let mut heap = Heap::new(HeapConfig::new(capacity))?;

  let mut root = NULL_HANDLE;
  let mut leaf = NULL_HANDLE;
  for _ in 0..depth.max(1) {
    let shape = heap.alloc_shape(leaf, 0)?;
    leaf = heap.alloc_object(shape, 0)?;
    if root.is_null() {
      root = leaf;
    }
  }
  if cycle {
    let root_shape = heap.get(root, OBJECT_SHAPE);
    heap.set(root_shape, SHAPE_PROTO, leaf)?;
  }

  let target: Handle = root;
  let search = if cycle {
    // Nothing in a cycle ends the walk, so look for an object that is not there.
    heap.walk_proto_chain_until(leaf, |_, _| false)
  } else {
    heap.walk_proto_chain_until(leaf, |_, h| h == target)
  };
  let outcome = match search {
    ChainSearch::Found { hops, .. } => ChainOutcome::Found { hops },
    ChainSearch::NotFound { visited, .. } => ChainOutcome::NotFound { visited },
    ChainSearch::DepthExceeded { visited, .. } => ChainOutcome::DepthExceeded { visited },
  };
  Ok(ChainReport {
    depth,
    cycle,
    outcome,
  })
}

fn stats(config: Option<PathBuf>) -> Result<heap_js::HeapStats, Box<dyn Error>> {
  let config = match config {
    Some(path) => HeapConfig::from_json_str(&std::fs::read_to_string(path)?)?,
    None => HeapConfig::default(),
  };
  let mut heap = Heap::new(config)?;

  let proto = heap.alloc_object(NULL_HANDLE, 0)?;
  let shape = heap.intern_shape(proto)?;
  let arr = heap.alloc_object(shape, 1)?;
  for i in 0..16 {
    heap.push_element(arr, Value::Int(i))?;
  }
  heap.alloc_object(shape, 2)?;
  Ok(heap.stats())
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
  let report = match args.command {
    Command::Stress {
      threads,
      allocs,
      size,
      capacity,
    } => serde_json::to_string_pretty(&stress(threads, allocs, size, capacity)?)?,
    Command::Chain { depth, cycle } => serde_json::to_string_pretty(&chain(depth, cycle)?)?,
    Command::Stats { config } => serde_json::to_string_pretty(&stats(config)?)?,
  };
  println!("{report}");
  Ok(())
}

fn main() {
  let args = Args::parse();
  install_subscriber(args.trace);

  if let Err(err) = run(args) {
    eprintln!("error: {err}");
    std::process::exit(1);
  }
}
