//! `SQLite` database for the marketplace server.

greenloop_core::define_database!(MarketDatabase, "Market database migrations complete");
