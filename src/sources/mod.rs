pub mod alchemy;
pub mod balances;
pub mod coingecko;
pub mod defillama;
pub mod dune;
pub mod prices;
