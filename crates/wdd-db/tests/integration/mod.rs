mod job_queue_tests;
