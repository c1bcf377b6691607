use maroon_engine::{Cast, MonteCarlo, PlayerProfile, Preset, SimConfig};
use std::collections::HashMap;

fn median_profile(name: &str) -> PlayerProfile {
    PlayerProfile {
        name: name.to_string(),
        challenge_win_prob: 0.5,
        category_scores: HashMap::new(),
        strategic: 0.5,
        jury_tendency: 0.5,
        vote_accuracy: 0.5,
        influence: 0.5,
        idol_aptitude: 0.08,
        prior_winner: false,
    }
}

fn varied_cast(n: usize) -> Cast {
    let players: Vec<PlayerProfile> = (0..n)
        .map(|i| {
            let spread = i as f64 / (n - 1) as f64;
            PlayerProfile {
                name: format!("castaway-{i}"),
                challenge_win_prob: 0.15 + 0.7 * spread,
                strategic: 0.85 - 0.6 * spread,
                jury_tendency: 0.2 + 0.5 * spread,
                vote_accuracy: 0.35 + 0.3 * spread,
                influence: 0.2 + 0.6 * spread,
                ..median_profile(&format!("castaway-{i}"))
            }
        })
        .collect();
    let compatibility = (0..n)
        .map(|a| {
            (0..n)
                .map(|b| 0.25 + 0.5 * ((2 * a + 3 * b) % 7) as f64 / 6.0)
                .collect()
        })
        .collect();
    Cast::new(players, compatibility).expect("valid cast")
}

#[test]
fn batch_probabilities_are_normalized_and_bounded() {
    let cast = varied_cast(18);
    let cfg = SimConfig::default();
    let stats = MonteCarlo::new(&cast, &cfg, 0xA11CE)
        .with_runs(1_000)
        .with_workers(4)
        .run();

    assert_eq!(stats.runs_completed(), 1_000);
    assert_eq!(stats.failure_count(), 0);

    let players = stats.player_stats(&cast);
    let win_total: f64 = players.iter().map(|p| p.win_probability).sum();
    assert!(
        (win_total - 1.0).abs() < 1e-9,
        "win probabilities sum to {win_total}"
    );
    let finalist_total: f64 = players.iter().map(|p| p.finalist_probability).sum();
    assert!(
        (finalist_total - 3.0).abs() < 1e-9,
        "three finalists per season, got {finalist_total}"
    );
    for player in &players {
        assert!((0.0..=1.0).contains(&player.win_probability));
        assert!((1.0..=18.0).contains(&player.average_placement));
        let bucket_total: u64 = player.placement_distribution.iter().sum();
        assert_eq!(bucket_total, 1_000, "{} histogram incomplete", player.name);
    }
}

#[test]
fn parallel_and_sequential_batches_agree_exactly() {
    let cast = varied_cast(12);
    let cfg = SimConfig::default();
    let sequential = MonteCarlo::new(&cast, &cfg, 404).with_runs(200).run();
    let parallel = MonteCarlo::new(&cast, &cfg, 404)
        .with_runs(200)
        .with_workers(8)
        .run();
    assert_eq!(sequential, parallel);
}

#[test]
fn a_prior_winner_flag_costs_win_probability() {
    // Two otherwise-identical median players; only the flag differs.
    let mut players: Vec<PlayerProfile> = (0..12)
        .map(|i| median_profile(&format!("median-{i}")))
        .collect();
    players[0].prior_winner = true;
    let cast = Cast::new(players, vec![vec![0.5; 12]; 12]).expect("valid cast");
    let cfg = SimConfig::default();
    let stats = MonteCarlo::new(&cast, &cfg, 31_337)
        .with_runs(2_000)
        .with_workers(4)
        .run();

    let players = stats.player_stats(&cast);
    let champion = players[0].win_probability;
    // Every unflagged twin should clear the champion comfortably.
    let twin_floor = players[1..]
        .iter()
        .map(|p| p.win_probability)
        .fold(f64::INFINITY, f64::min);
    assert!(
        champion < twin_floor,
        "prior winner won {champion:.4}, cheapest twin {twin_floor:.4}"
    );
}

#[test]
fn merge_rates_respect_the_format() {
    let cast = varied_cast(18);
    let cfg = SimConfig::default();
    let stats = MonteCarlo::new(&cast, &cfg, 8_080).with_runs(300).run();
    let players = stats.player_stats(&cast);
    let merge_total: f64 = players.iter().map(|p| p.merge_probability).sum();
    // Exactly merge_at players survive to the merge each season.
    assert!(
        (merge_total - f64::from(cfg.format.merge_at)).abs() < 1e-9,
        "merge probabilities sum to {merge_total}"
    );
}

#[test]
fn presets_produce_complete_batches() {
    let cast = varied_cast(18);
    for preset in [Preset::Predictable, Preset::MaximumChaos, Preset::IdolFest] {
        let cfg = preset.config();
        let stats = MonteCarlo::new(&cast, &cfg, 1_234).with_runs(100).run();
        assert_eq!(
            stats.runs_completed(),
            100,
            "preset {preset} dropped runs from the batch"
        );
    }
}

#[test]
fn low_chaos_rewards_stronger_profiles() {
    // Under the predictable preset, the cast's top composite profiles
    // should clearly outperform the weakest on average placement.
    let cast = varied_cast(18);
    let cfg = Preset::Predictable.config();
    let stats = MonteCarlo::new(&cast, &cfg, 90_210)
        .with_runs(600)
        .with_workers(4)
        .run();
    let players = stats.player_stats(&cast);
    let best_avg = players
        .iter()
        .map(|p| p.average_placement)
        .fold(f64::INFINITY, f64::min);
    let worst_avg = players
        .iter()
        .map(|p| p.average_placement)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(
        worst_avg - best_avg > 1.0,
        "placements barely differentiate: best {best_avg:.2}, worst {worst_avg:.2}"
    );
}
