use std::convert::Infallible;

use bencher::{benchmark_group, benchmark_main, Bencher};
use rxsubject::prelude::*;

#[derive(Default)]
struct Sink(usize);

impl Listener for Sink {
  fn receive(&mut self, message: &str) -> Result<(), Infallible> {
    self.0 += message.len();
    Ok(())
  }
}

fn local_broadcast(b: &mut Bencher) {
  let subject: LocalSubject = LocalSubject::new();
  let sinks: Vec<_> = (0..16).map(|_| MutRc::own(Sink::default())).collect();
  sinks.iter().for_each(|s| subject.attach(s));

  b.iter(|| subject.set_state("tick").unwrap());
}

fn shared_broadcast(b: &mut Bencher) {
  let subject: SharedSubject = SharedSubject::new();
  let sinks: Vec<_> = (0..16).map(|_| MutArc::own(Sink::default())).collect();
  sinks.iter().for_each(|s| subject.attach(s));

  b.iter(|| subject.set_state("tick").unwrap());
}

fn attach_detach(b: &mut Bencher) {
  let subject: LocalSubject = LocalSubject::new();
  let sink = MutRc::own(Sink::default());

  b.iter(|| {
    subject.attach(&sink);
    subject.detach(&sink)
  });
}

benchmark_group!(benches, local_broadcast, shared_broadcast, attach_detach);
benchmark_main!(benches);
