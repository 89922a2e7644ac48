//! Property tests for the DSC engine.
//!
//! Random operation sequences, including ones that fail, must never break
//! solvency or the agreement between the engine's books and the ledgers.

use std::sync::Arc;

use proptest::prelude::*;

use dsc::prelude::*;

const E18: u128 = PRECISION;
const USERS: usize = 3;

struct World {
    engine: DscEngine,
    token: Arc<StableToken>,
    ledger: Arc<InMemoryTokenLedger>,
    feeds: Arc<FeedRegistry<ManualClock>>,
    weth: AssetId,
    eth_usd: FeedId,
    users: Vec<Address>,
}

fn world(price_dollars: u128) -> World {
    let engine_address = Address::from_label("engine");
    let weth = AssetId::from_label("weth");
    let eth_usd = FeedId::from_label("eth-usd");
    let feeds = Arc::new(FeedRegistry::new(ManualClock::new(1_700_000_000)));
    feeds
        .add_feed(eth_usd, 8, (price_dollars * 1_0000_0000) as i128)
        .unwrap();

    let token = Arc::new(StableToken::new(Address::from_label("dsc"), engine_address));
    let ledger = Arc::new(InMemoryTokenLedger::new());
    let users: Vec<Address> = (0..USERS)
        .map(|i| Address::from_label(&format!("user-{}", i)))
        .collect();
    for user in &users {
        ledger.mint(&weth, user, 1_000 * E18).unwrap();
        ledger.approve(&weth, user, &engine_address, u128::MAX).unwrap();
        token.approve(user, &engine_address, u128::MAX).unwrap();
    }

    let engine = DscEngine::new(
        engine_address,
        vec![weth],
        vec![eth_usd],
        token.id(),
        Collaborators::new(token.clone(), ledger.clone(), feeds.clone()),
    )
    .unwrap();

    World {
        engine,
        token,
        ledger,
        feeds,
        weth,
        eth_usd,
        users,
    }
}

#[derive(Debug, Clone)]
enum Op {
    Deposit(usize, u128),
    Mint(usize, u128),
    DepositAndMint(usize, u128, u128),
    Redeem(usize, u128),
    Burn(usize, u128),
    RedeemForDsc(usize, u128, u128),
}

fn amount() -> impl Strategy<Value = u128> {
    prop_oneof![Just(0u128), 1u128..50 * E18]
}

fn debt() -> impl Strategy<Value = u128> {
    prop_oneof![Just(0u128), 1u128..50_000 * E18]
}

fn op() -> impl Strategy<Value = Op> {
    let user = 0..USERS;
    prop_oneof![
        (user.clone(), amount()).prop_map(|(u, a)| Op::Deposit(u, a)),
        (user.clone(), debt()).prop_map(|(u, d)| Op::Mint(u, d)),
        (user.clone(), amount(), debt()).prop_map(|(u, a, d)| Op::DepositAndMint(u, a, d)),
        (user.clone(), amount()).prop_map(|(u, a)| Op::Redeem(u, a)),
        (user.clone(), debt()).prop_map(|(u, d)| Op::Burn(u, d)),
        (user, amount(), debt()).prop_map(|(u, a, d)| Op::RedeemForDsc(u, a, d)),
    ]
}

impl World {
    fn apply(&self, op: &Op) -> Result<()> {
        let e = &self.engine;
        match *op {
            Op::Deposit(u, a) => e.deposit_collateral(self.users[u], self.weth, a),
            Op::Mint(u, d) => e.mint_dsc(self.users[u], d),
            Op::DepositAndMint(u, a, d) => {
                e.deposit_collateral_and_mint_dsc(self.users[u], self.weth, a, d)
            }
            Op::Redeem(u, a) => e.redeem_collateral(self.users[u], self.weth, a),
            Op::Burn(u, d) => e.burn_dsc(self.users[u], d),
            Op::RedeemForDsc(u, a, d) => {
                e.redeem_collateral_for_dsc(self.users[u], self.weth, a, d)
            }
        }
    }

    fn books_balance(&self) -> bool {
        let custody = self.ledger.balance_of(&self.weth, &self.engine.address());
        let wallets: u128 = self
            .users
            .iter()
            .map(|u| self.ledger.balance_of(&self.weth, u))
            .sum();
        self.engine.total_debt().unwrap() == self.token.total_supply()
            && self.engine.total_collateral(&self.weth).unwrap() == custody
            && custody + wallets == USERS as u128 * 1_000 * E18
            && self.engine.state().unwrap().accounts.verify_invariant()
            && self.token.verify_supply_invariant()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_committed_positions_stay_solvent(
        price in 100u128..5_000,
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let w = world(price);
        for op in &ops {
            let _ = w.apply(op);
            for user in &w.users {
                prop_assert!(w.engine.health_factor(user).unwrap() >= MIN_HEALTH_FACTOR);
            }
        }
    }

    #[test]
    fn prop_books_match_ledgers(
        price in 100u128..5_000,
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let w = world(price);
        for op in &ops {
            let before = w.engine.state().unwrap();
            let result = w.apply(op);
            if result.is_err() {
                prop_assert_eq!(w.engine.state().unwrap(), before);
            }
            prop_assert!(w.books_balance());
        }
    }

    #[test]
    fn prop_deposit_then_redeem_restores_wallet(
        amount in 1u128..1_000 * E18,
    ) {
        let w = world(2_000);
        let user = w.users[0];
        let wallet = w.ledger.balance_of(&w.weth, &user);

        w.engine.deposit_collateral(user, w.weth, amount).unwrap();
        w.engine.redeem_collateral(user, w.weth, amount).unwrap();

        prop_assert_eq!(w.ledger.balance_of(&w.weth, &user), wallet);
        prop_assert!(w.engine.account(&user).unwrap().is_empty());
        prop_assert_eq!(w.engine.events().unwrap().len(), 2);
    }

    #[test]
    fn prop_successful_liquidation_improves_health(
        collateral in 1u128..20,
        debt_pct in 10u128..=100,
        crash_price in 12u128..2_000,
        cover_pct in 1u128..=100,
    ) {
        let w = world(2_000);
        let (target, liquidator) = (w.users[0], w.users[1]);
        let max_debt = collateral * 1_000 * E18;
        let debt = max_debt * debt_pct / 100;

        w.engine
            .deposit_collateral_and_mint_dsc(target, w.weth, collateral * E18, debt)
            .unwrap();
        w.engine
            .deposit_collateral_and_mint_dsc(liquidator, w.weth, 1_000 * E18, debt)
            .unwrap();
        w.feeds
            .update_answer(&w.eth_usd, (crash_price * 1_0000_0000) as i128)
            .unwrap();

        let starting = w.engine.health_factor(&target).unwrap();
        let cover = (debt * cover_pct / 100).max(1);
        let seized_before = w.ledger.balance_of(&w.weth, &liquidator);

        match w.engine.liquidate(liquidator, w.weth, target, cover) {
            Ok(()) => {
                prop_assert!(starting < MIN_HEALTH_FACTOR);
                prop_assert!(w.engine.health_factor(&target).unwrap() > starting);
                let quote = w.engine.liquidation_quote(&w.weth, cover).unwrap();
                prop_assert_eq!(
                    w.ledger.balance_of(&w.weth, &liquidator) - seized_before,
                    quote.total_seized
                );
            }
            Err(Error::HealthFactorOk) => prop_assert!(starting >= MIN_HEALTH_FACTOR),
            Err(Error::HealthFactorNotImproved)
            | Err(Error::InsufficientCollateral { .. })
            | Err(Error::HealthFactorBroken(_)) => {}
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
        prop_assert!(w.books_balance());
    }
}
