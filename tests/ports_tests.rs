/// Integration tests for address expansion and port checks
///
/// Run these tests with: cargo test --test ports_tests
use std::net::TcpListener;
use std::time::Duration;
use tns_cli_lib::ports::racinfo::RacInfo;
use tns_cli_lib::ports::resolver::DnsLookup;
use tns_cli_lib::ports::{check_ports, expand_addresses, PortState, RacResolver, ServiceAddress};
use tns_cli_lib::tns::TnsEntry;
use tns_cli_lib::TnsError;

const RACINFO: &str = "
# cluster members
[MYRAC.RAC.LAN]
scan=myrac.rac.lan
vip1=vip1.rac.lan:1522
vip2=vip2.rac.lan
";

fn rac_resolver() -> RacResolver<DnsLookup> {
    RacResolver::new(RacInfo::parse(RACINFO).unwrap(), None, false)
}

#[test]
fn test_cluster_host_fans_out_in_order() {
    let entry = TnsEntry::new(
        "RACDB",
        "(DESCRIPTION=(ADDRESS_LIST=(ADDRESS=(PROTOCOL=TCP)(HOST=myrac.rac.lan)(PORT=1521))(ADDRESS=(PROTOCOL=TCP)(HOST=10.0.0.9)(PORT=1525)))(CONNECT_DATA=(SERVICE_NAME=racdb)))",
        "tnsnames.ora:1",
    );

    let addresses = expand_addresses(&entry, &rac_resolver()).unwrap();

    let listed: Vec<&str> = addresses.iter().map(|a| a.address.as_str()).collect();
    assert_eq!(
        listed,
        vec![
            "myrac.rac.lan:1521",
            "vip1.rac.lan:1522",
            "vip2.rac.lan:1521",
            "10.0.0.9:1525"
        ]
    );
    println!("✓ {} addresses for {}", addresses.len(), entry.name);
}

#[test]
fn test_descriptor_without_host() {
    let entry = TnsEntry::new("EMPTY", "(DESCRIPTION=(CONNECT_DATA=(SID=x)))", "tnsnames.ora:3");

    let err = expand_addresses(&entry, &rac_resolver()).unwrap_err();

    assert!(matches!(err, TnsError::NotFound(_)));
    assert_eq!(err.to_string(), "no hosts found for alias EMPTY");
}

#[test]
fn test_check_ports_open_and_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let open_port = listener.local_addr().unwrap().port();
    let closed_port = {
        let probe = TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };
    let addresses = vec![
        ServiceAddress::new("db1", open_port.to_string(), format!("127.0.0.1:{}", open_port)),
        ServiceAddress::new("db2", closed_port.to_string(), format!("127.0.0.1:{}", closed_port)),
    ];

    let checks = check_ports(&addresses, Duration::from_secs(2));

    assert_eq!(checks.len(), 2);
    assert_eq!(checks[0].state, PortState::Open);
    assert_eq!(checks[0].line(), format!("db1 (127.0.0.1:{}) is OPEN", open_port));
    assert_eq!(checks[1].state, PortState::Refused);
    assert!(checks[1].detail.is_some());
    assert!(checks[1].line().ends_with("is CLOSED/REFUSED (no service)"));
}
