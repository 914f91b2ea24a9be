pub mod database_backup;
