pub mod db;
pub mod demo;
pub mod memory;
pub mod supabase_auth;

pub use db::DbAdapter;
pub use memory::MemoryStore;
pub use supabase_auth::SupabaseAuthAdapter;
