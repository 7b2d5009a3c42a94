//! Full-session benchmarks, driven through the same public
//! `sessions::make_*` + `MultiHandler` surface as `tests/sessions.rs`.
//! Gated behind `bench-internals` since they measure whole protocol
//! runs rather than a single internal primitive.

use std::collections::BTreeMap;

use accord::curve::Secp256k1;
use accord::params::TestSchemeParams;
use accord::party::{IdSlice, PartyId};
use accord::rounds::{Message, MultiHandler, Round, Status};
use accord::sessions::{make_cmp_keygen_session, make_frost_keygen_session};
use accord::{CmpKeygenRound, FrostKeygenRound, KeygenMode};

use criterion::{criterion_group, criterion_main, Criterion};
use rand::seq::SliceRandom;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn party(label: &str) -> PartyId {
    PartyId::new(label.as_bytes().to_vec())
}

fn run_to_completion<R: Round>(
    ids: &[PartyId],
    mut handlers: BTreeMap<PartyId, MultiHandler<R>>,
    rng: &mut ChaCha8Rng,
) -> BTreeMap<PartyId, R::Output> {
    let mut outputs = BTreeMap::new();
    let mut queue: Vec<Message> = Vec::new();
    for handler in handlers.values_mut() {
        while let Some(msg) = handler.pop_outgoing() {
            queue.push(msg);
        }
    }

    while outputs.len() < ids.len() {
        queue.shuffle(rng);
        let msg = queue.pop().expect("queue ran dry before every party finished");
        let targets: Vec<PartyId> = match &msg.to {
            Some(to) => vec![to.clone()],
            None => ids.iter().filter(|id| **id != &msg.from).cloned().collect(),
        };
        for target in targets {
            if outputs.contains_key(&target) {
                continue;
            }
            let handler = handlers.get_mut(&target).expect("unknown target party");
            match handler.deliver(rng, msg.clone()) {
                Status::InProgress => {}
                Status::Output(output) => {
                    outputs.insert(target.clone(), output);
                }
                Status::Abort(reason) => panic!("session for {target:?} aborted: {reason:?}"),
            }
            while let Some(out) = handler.pop_outgoing() {
                queue.push(out);
            }
        }
    }
    outputs
}

fn bench_cmp_keygen(c: &mut Criterion) {
    let ids: Vec<PartyId> = ["a", "b", "c", "d"].iter().map(|s| party(s)).collect();
    let participants = IdSlice::new(ids.clone()).unwrap();
    let threshold = 2;

    c.bench_function("cmp keygen, 4 parties, threshold 2", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            let handlers: BTreeMap<PartyId, MultiHandler<CmpKeygenRound<TestSchemeParams>>> = ids
                .iter()
                .map(|id| {
                    let handler = make_cmp_keygen_session::<TestSchemeParams>(
                        &mut rng,
                        id.clone(),
                        participants.clone(),
                        threshold,
                        KeygenMode::Fresh,
                        [0u8; 32],
                    );
                    (id.clone(), handler)
                })
                .collect();
            run_to_completion(&ids, handlers, &mut rng)
        })
    });
}

fn bench_frost_keygen(c: &mut Criterion) {
    let ids: Vec<PartyId> = ["a", "b", "c", "d", "e"].iter().map(|s| party(s)).collect();
    let participants = IdSlice::new(ids.clone()).unwrap();
    let threshold = 3;

    c.bench_function("frost keygen secp256k1, 5 parties, threshold 3", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            let handlers: BTreeMap<PartyId, MultiHandler<FrostKeygenRound<Secp256k1>>> = ids
                .iter()
                .map(|id| {
                    let handler =
                        make_frost_keygen_session::<Secp256k1>(&mut rng, id.clone(), participants.clone(), threshold, [0u8; 32]);
                    (id.clone(), handler)
                })
                .collect();
            run_to_completion(&ids, handlers, &mut rng)
        })
    });
}

criterion_group!(benches, bench_cmp_keygen, bench_frost_keygen);
criterion_main!(benches);
