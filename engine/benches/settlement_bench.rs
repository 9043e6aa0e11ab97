// Settlement benchmarks for the sharevault distribution engine.
//
// Covers the withdrawable query, the full withdraw cycle against an
// in-memory treasury, and transfer settlement as the number of funded
// assets grows.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use sharevault::{Asset, ShareBook, TokenId, Treasury, Vault};

/// Sets up a vault over `n` holders with ascending share counts, funded
/// once with 1_000_000 units of the native asset.
fn setup_vault(n: usize) -> (Vault<ShareBook>, Treasury) {
    let mut book = ShareBook::new();
    let holders: Vec<String> = (0..n).map(|i| format!("holder-{i}")).collect();
    for (i, holder) in holders.iter().enumerate() {
        book.issue(holder, (i + 1) as u64 * 10).unwrap();
    }

    let mut vault = Vault::new(book);
    let mut treasury = Treasury::new();
    treasury.fund(Asset::Native, 1_000_000);
    vault.deposit(Asset::Native, 1_000_000).unwrap();
    (vault, treasury)
}

fn bench_withdrawable(c: &mut Criterion) {
    let (vault, _treasury) = setup_vault(100);

    c.bench_function("settlement/withdrawable", |b| {
        b.iter(|| vault.withdrawable("holder-50", Asset::Native).unwrap());
    });
}

fn bench_withdraw_cycle(c: &mut Criterion) {
    c.bench_function("settlement/withdraw_cycle", |b| {
        b.iter_with_setup(
            || setup_vault(100),
            |(mut vault, mut treasury)| {
                vault
                    .withdraw("holder-50", Asset::Native, &mut treasury)
                    .unwrap();
            },
        );
    });
}

fn bench_transfer_settlement(c: &mut Criterion) {
    let mut group = c.benchmark_group("settlement/share_transfer");

    // Settlement walks every funded asset, so cost scales with how many
    // assets the vault has ever received.
    for asset_count in [1usize, 4, 16, 64] {
        group.throughput(Throughput::Elements(asset_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(asset_count),
            &asset_count,
            |b, &n| {
                b.iter_with_setup(
                    || {
                        let (mut vault, mut treasury) = setup_vault(100);
                        for i in 1..n {
                            let token = Asset::Token(TokenId::derive(
                                &format!("Bench Token {i}"),
                                "BNT",
                                "vault:bench",
                            ));
                            treasury.fund(token, 1_000_000);
                            vault.deposit(token, 1_000_000).unwrap();
                        }
                        vault
                    },
                    |mut vault| {
                        vault.on_share_transfer("holder-50", "holder-1", 100).unwrap();
                    },
                );
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_withdrawable,
    bench_withdraw_cycle,
    bench_transfer_settlement,
);
criterion_main!(benches);
