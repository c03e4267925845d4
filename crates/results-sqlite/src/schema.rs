pub const MIG_0001_INIT: &str = r#"
BEGIN;

CREATE TABLE scan_runs (
  scan_id                   TEXT PRIMARY KEY,
  target_id                 TEXT NOT NULL,
  status                    TEXT NOT NULL CHECK (status IN ('pending','discovering_ips','port_scanning','success','error')),
  total_network_ranges      INTEGER NOT NULL DEFAULT 0,
  processed_network_ranges  INTEGER NOT NULL DEFAULT 0,
  total_ips_discovered      INTEGER NOT NULL DEFAULT 0,
  total_ports_scanned       INTEGER NOT NULL DEFAULT 0,
  live_web_servers_found    INTEGER NOT NULL DEFAULT 0,
  error_message             TEXT,
  execution_time_ms         INTEGER,
  created_at_ms             INTEGER NOT NULL,
  session_id                TEXT
);

CREATE TABLE discovered_hosts (
  host_id           INTEGER PRIMARY KEY AUTOINCREMENT,
  scan_id           TEXT NOT NULL REFERENCES scan_runs(scan_id) ON DELETE CASCADE,
  ip_address        TEXT NOT NULL,
  hostname          TEXT,
  network_range     TEXT NOT NULL,
  latency_ms        REAL,
  discovered_at_ms  INTEGER NOT NULL,
  UNIQUE (scan_id, ip_address)
);

CREATE TABLE live_web_services (
  service_id        INTEGER PRIMARY KEY AUTOINCREMENT,
  scan_id           TEXT NOT NULL REFERENCES scan_runs(scan_id) ON DELETE CASCADE,
  ip_address        TEXT NOT NULL,
  hostname          TEXT,
  port              INTEGER NOT NULL CHECK (port BETWEEN 1 AND 65535),
  protocol          TEXT NOT NULL CHECK (protocol IN ('http','https')),
  url               TEXT NOT NULL,
  status_code       INTEGER,
  title             TEXT,
  server_header     TEXT,
  content_length    INTEGER,
  technologies_json TEXT NOT NULL DEFAULT '[]',
  response_time_ms  REAL,
  last_checked_ms   INTEGER NOT NULL,
  UNIQUE (scan_id, ip_address, port, protocol)
);

CREATE TABLE network_ranges (
  range_id          INTEGER PRIMARY KEY AUTOINCREMENT,
  target_id         TEXT NOT NULL,
  cidr_block        TEXT NOT NULL,
  asn               TEXT,
  organization      TEXT,
  description       TEXT,
  country           TEXT,
  source            TEXT,
  UNIQUE (target_id, cidr_block)
);

CREATE INDEX idx_scan_runs_target ON scan_runs(target_id, created_at_ms);
CREATE INDEX idx_discovered_hosts_scan ON discovered_hosts(scan_id);
CREATE INDEX idx_live_web_services_scan ON live_web_services(scan_id);
CREATE INDEX idx_live_web_services_ip_port ON live_web_services(ip_address, port);
CREATE INDEX idx_network_ranges_target ON network_ranges(target_id);

COMMIT;
"#
;
